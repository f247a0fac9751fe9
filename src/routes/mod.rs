//! API route handlers - maps HTTP endpoints to dataset queries.
//!
//! Each submodule defines routes for a feature area:
//! - `dataset`: Codebase summary and default entity selections
//! - `commits`: Commit history with author filtering, module contributors
//! - `files`: Tagged commit-file rows with module/component/extension filters
//! - `stats`: Aggregation views (stability, evolution, specialization, ...)

pub mod commits;
pub mod dataset;
pub mod files;
pub mod stats;

use axum::Router;

use crate::cache::SharedDataset;

pub fn create_router(dataset: SharedDataset) -> Router {
    Router::new()
        .merge(dataset::routes(dataset.clone()))
        .merge(commits::routes(dataset.clone()))
        .merge(files::routes(dataset.clone()))
        .merge(stats::routes(dataset))
}
