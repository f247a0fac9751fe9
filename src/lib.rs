//! Git commit-log analytics.
//!
//! Turns a repository's history into two tagged tables (commits and
//! per-file line counts) and serves aggregation views over them.
//!
//! Stages, in order:
//! 1. `git`: export and parse the log, resolve renames
//! 2. `tagging`: directory-convention tags per file path
//! 3. `authors`: canonical author names
//! 4. `dataset`: joined, typed clean tables
//! 5. `stats`: aggregation views, served by `routes`

pub mod authors;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod error;
pub mod git;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod stats;
pub mod store;
pub mod tagging;
