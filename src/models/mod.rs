//! Tables and data transfer objects.
//!
//! - `commit`: raw-stage rows (`Commit`, `CommitFile`) and path tags
//! - `dataset`: typed clean-stage rows (`CleanCommit`, `CleanCommitFile`)
//! - `api`: JSON responses of the `serve` API

pub mod api;
pub mod commit;
pub mod dataset;

pub use api::*;
pub use commit::*;
pub use dataset::*;
