pub mod parser;
pub mod rename;
pub mod repository;

pub use parser::{parse_log, ParsedLog};
pub use rename::resolve_renames;
pub use repository::GitRepository;
