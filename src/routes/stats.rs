//! Aggregation view endpoints.
//!
//! - GET /api/v1/stats: every configured view
//! - GET /api/v1/stats/{id}: one view by id
//!
//! Views come from `<codebase>_stats.yaml` when `serve --custom-stats` is set,
//! otherwise from the built-in catalog.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::cache::SharedDataset;
use crate::error::Result;
use crate::stats::StatResult;

pub fn routes(dataset: SharedDataset) -> Router {
    Router::new()
        .route("/api/v1/stats", get(list_stats))
        .route("/api/v1/stats/{id}", get(get_stat))
        .with_state(dataset)
}

async fn list_stats(State(dataset): State<SharedDataset>) -> Result<Json<Vec<StatResult>>> {
    let results = dataset.stats()?;
    Ok(Json(results))
}

async fn get_stat(
    State(dataset): State<SharedDataset>,
    Path(id): Path<String>,
) -> Result<Json<StatResult>> {
    let result = dataset.stat(&id)?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::routes::fixtures;
    use crate::stats::{SeriesPoint, StatOutput};

    #[tokio::test]
    async fn lists_default_views_with_components() {
        let (_dir, dataset) = fixtures::dataset();

        let Json(results) = list_stats(State(dataset)).await.unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert!(ids.contains(&"module_stability"));
        assert!(ids.contains(&"component_repartition"));
    }

    #[tokio::test]
    async fn module_size_sums_code_lines() {
        let (_dir, dataset) = fixtures::dataset();

        let Json(result) = get_stat(State(dataset), Path("module_size".to_string())).await.unwrap();

        assert_eq!(
            result.output,
            StatOutput::Series {
                index: vec!["module_nm".to_string()],
                points: vec![
                    SeriesPoint { key: vec!["api".to_string()], value: Some(4.0) },
                    SeriesPoint { key: vec!["core".to_string()], value: Some(12.0) },
                ],
            }
        );
    }

    #[tokio::test]
    async fn unknown_view_is_not_found() {
        let (_dir, dataset) = fixtures::dataset();

        let result = get_stat(State(dataset), Path("nope".to_string())).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
