//! Dataset summary endpoints.
//!
//! - GET /api/v1/dataset
//!   Codebase name, row counts, first/last commit date, areas.
//!   Used by: dashboard header
//!
//! - GET /api/v1/entities/{field}/key-labels
//!   Entities whose code-line total exceeds 10% of the top one.
//!   Used by: default selection of entity filters

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::cache::SharedDataset;
use crate::error::Result;
use crate::models::{DatasetInfo, KeyLabels};
use crate::stats::Field;

pub fn routes(dataset: SharedDataset) -> Router {
    Router::new()
        .route("/api/v1/dataset", get(get_dataset_info))
        .route("/api/v1/entities/{field}/key-labels", get(get_key_labels))
        .with_state(dataset)
}

async fn get_dataset_info(State(dataset): State<SharedDataset>) -> Result<Json<DatasetInfo>> {
    let info = dataset.info()?;
    Ok(Json(info))
}

async fn get_key_labels(
    State(dataset): State<SharedDataset>,
    Path(field): Path<String>,
) -> Result<Json<KeyLabels>> {
    let field = Field::parse(&field)?;
    let labels = dataset.with_cache(|cache| Ok(cache.key_labels(field)))?;
    Ok(Json(labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::routes::fixtures;

    #[tokio::test]
    async fn dataset_info_counts_rows() {
        let (_dir, dataset) = fixtures::dataset();

        let Json(info) = get_dataset_info(State(dataset)).await.unwrap();

        assert_eq!(info.codebase_nm, "demo");
        assert_eq!(info.n_commits, 3);
        assert_eq!(info.n_commit_files, 4);
        assert_eq!(info.areas, vec!["src"]);
        assert!(info.has_components);
    }

    #[tokio::test]
    async fn key_labels_for_module() {
        let (_dir, dataset) = fixtures::dataset();

        let Json(labels) = get_key_labels(State(dataset), Path("module_nm".to_string()))
            .await
            .unwrap();

        assert_eq!(labels.field, "module_nm");
        assert_eq!(labels.labels, vec!["core", "api"]);
    }

    #[tokio::test]
    async fn unknown_field_is_rejected() {
        let (_dir, dataset) = fixtures::dataset();

        let result = get_key_labels(State(dataset), Path("colour".to_string())).await;
        assert!(matches!(result, Err(AppError::InvalidQuery(_))));
    }
}
