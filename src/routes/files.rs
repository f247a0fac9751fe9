//! Tagged commit-file rows.
//!
//! GET /api/v1/commit-files?module=&component=&ext=&limit=&offset=
//!
//! Returns clean rows (path, tags, line counts, author, date) in dataset order.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::cache::{FileFilter, SharedDataset};
use crate::error::Result;
use crate::models::CommitFileListResponse;

pub fn routes(dataset: SharedDataset) -> Router {
    Router::new()
        .route("/api/v1/commit-files", get(get_commit_files))
        .with_state(dataset)
}

#[derive(Debug, Default, Deserialize)]
struct FilesQuery {
    module: Option<String>,
    component: Option<String>,
    ext: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_limit() -> usize {
    100
}

async fn get_commit_files(
    State(dataset): State<SharedDataset>,
    Query(query): Query<FilesQuery>,
) -> Result<Json<CommitFileListResponse>> {
    let filter = FileFilter {
        module: query.module,
        component: query.component,
        ext: query.ext,
    };
    let response = dataset.with_cache(|cache| Ok(cache.query_files(&filter, query.limit, query.offset)))?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::fixtures;

    #[tokio::test]
    async fn filters_by_component() {
        let (_dir, dataset) = fixtures::dataset();
        let query = FilesQuery {
            component: Some("model".to_string()),
            limit: 10,
            ..Default::default()
        };

        let Json(page) = get_commit_files(State(dataset), Query(query)).await.unwrap();

        assert_eq!(page.total, 4);
        assert_eq!(page.filtered_total, 2);
        assert!(page.files.iter().all(|f| f.file_path == "src/core/core_model.py"));
        assert!(page.files.iter().all(|f| f.module_nm.as_deref() == Some("core")));
    }

    #[tokio::test]
    async fn non_code_rows_carry_zero_code_lines() {
        let (_dir, dataset) = fixtures::dataset();
        let query = FilesQuery {
            ext: Some("other".to_string()),
            limit: 10,
            ..Default::default()
        };

        let Json(page) = get_commit_files(State(dataset), Query(query)).await.unwrap();

        assert_eq!(page.files.len(), 1);
        assert_eq!(page.files[0].file_path, "README.md");
        assert_eq!(page.files[0].n_lines_inserted, 1);
        assert_eq!(page.files[0].n_code_lines_inserted, 0);
        assert_eq!(page.files[0].component_nm.as_deref(), Some("other"));
        assert!(!page.files[0].is_src());
    }
}
