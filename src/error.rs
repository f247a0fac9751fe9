//! Application error types and HTTP response mapping.
//!
//! Defines `AppError` enum for every fatal condition of the pipeline and
//! implements Axum's `IntoResponse` so the same errors surface as JSON error
//! bodies from the `serve` API.
//!
//! Error mappings:
//! - `NotFound`, `DatasetNotFound` → 404
//! - `InvalidPipeline`, `InvalidQuery` → 400
//! - everything else → 500

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    /// The log export command exited non-zero; carries its stderr verbatim.
    #[error("git log failed: {0}")]
    GitLogFailed(String),

    #[error("Malformed log at line {line}: {reason}")]
    MalformedLog { line: usize, reason: String },

    #[error("Invalid timestamp '{value}' on commit {commit_id}")]
    InvalidTimestamp { commit_id: String, value: String },

    #[error("Author alias file {} is not valid structured data: {message}", path.display())]
    InvalidAliasFile { path: PathBuf, message: String },

    #[error("Commit file row references {matches} commits for id {commit_id}")]
    JoinCardinality { commit_id: String, matches: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    #[error("Invalid aggregation pipeline: {0}")]
    InvalidPipeline(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) | AppError::DatasetNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidPipeline(_) | AppError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
