//! Commit history endpoints.
//!
//! - GET /api/v1/commits?author=&limit=&offset=
//!   Paginated commits, newest first, with the overall contributor ranking.
//!
//! - GET /api/v1/modules/{module}/contributors
//!   Authors of one module ranked by commits then code lines (cached per module).

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::cache::SharedDataset;
use crate::error::Result;
use crate::models::{CommitListResponse, ContributorInfo};

pub fn routes(dataset: SharedDataset) -> Router {
    Router::new()
        .route("/api/v1/commits", get(get_commits))
        .route("/api/v1/modules/{module}/contributors", get(get_module_contributors))
        .with_state(dataset)
}

#[derive(Debug, Deserialize)]
struct CommitsQuery {
    author: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_limit() -> usize {
    50
}

async fn get_commits(
    State(dataset): State<SharedDataset>,
    Query(query): Query<CommitsQuery>,
) -> Result<Json<CommitListResponse>> {
    let response = dataset.with_cache(|cache| {
        Ok(cache.query_commits(query.author.as_deref(), query.limit, query.offset))
    })?;
    Ok(Json(response))
}

async fn get_module_contributors(
    State(dataset): State<SharedDataset>,
    Path(module): Path<String>,
) -> Result<Json<Vec<ContributorInfo>>> {
    let contributors = dataset.with_cache(|cache| cache.contributors_for_module(&module))?;
    Ok(Json(contributors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::routes::fixtures;

    fn query(author: Option<&str>, limit: usize, offset: usize) -> Query<CommitsQuery> {
        Query(CommitsQuery {
            author: author.map(str::to_string),
            limit,
            offset,
        })
    }

    #[tokio::test]
    async fn commits_newest_first() {
        let (_dir, dataset) = fixtures::dataset();

        let Json(page) = get_commits(State(dataset), query(None, 2, 0)).await.unwrap();

        let ids: Vec<&str> = page.commits.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c3", "b2"]);
        assert_eq!(page.total, 3);
        assert!(page.has_more);
        assert_eq!(page.commits[0].n_code_lines_inserted, 4);
    }

    #[tokio::test]
    async fn commits_filtered_by_author() {
        let (_dir, dataset) = fixtures::dataset();

        let Json(page) = get_commits(State(dataset), query(Some("bob"), 50, 1)).await.unwrap();

        assert_eq!(page.filtered_total, 2);
        assert_eq!(page.commits.len(), 1);
        assert_eq!(page.commits[0].id, "a1");
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn out_of_range_offset_keeps_server_usable() {
        let (_dir, dataset) = fixtures::dataset();

        let Json(page) = get_commits(State(dataset.clone()), query(None, 1, usize::MAX))
            .await
            .unwrap();
        assert!(page.commits.is_empty());
        assert!(!page.has_more);

        assert_eq!(dataset.info().unwrap().n_commits, 3);
    }

    #[tokio::test]
    async fn module_contributors() {
        let (_dir, dataset) = fixtures::dataset();

        let Json(contributors) = get_module_contributors(State(dataset.clone()), Path("core".to_string()))
            .await
            .unwrap();
        assert_eq!(contributors.len(), 1);
        assert_eq!(contributors[0].name, "bob");
        assert_eq!(contributors[0].commit_count, 2);
        assert_eq!(contributors[0].n_code_lines_inserted, 12);

        let missing = get_module_contributors(State(dataset), Path("ghost".to_string())).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
