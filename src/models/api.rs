//! Response DTOs of the `serve` API.
//!
//! - `DatasetInfo`: codebase summary (GET /api/v1/dataset)
//! - `CommitSummary`, `CommitListResponse`: paginated commit history
//! - `CommitFileListResponse`: paginated tagged file rows
//! - `ContributorInfo`: author with commit and code-line counts
//! - `KeyLabels`: default entity selection for a field

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::dataset::CleanCommitFile;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub codebase_nm: String,
    pub n_commits: usize,
    pub n_commit_files: usize,
    pub first_commit_dt: Option<DateTime<Utc>>,
    pub last_commit_dt: Option<DateTime<Utc>>,
    pub areas: Vec<String>,
    pub has_components: bool,
    /// Seconds since the in-memory cache was built.
    pub cache_age_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitSummary {
    pub id: String,
    pub msg: String,
    pub author_nm: String,
    pub creation_dt: DateTime<Utc>,
    pub relative_time: String,
    pub n_code_lines_inserted: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitListResponse {
    pub commits: Vec<CommitSummary>,
    pub total: usize,
    pub filtered_total: usize,
    pub has_more: bool,
    pub contributors: Vec<ContributorInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitFileListResponse {
    pub files: Vec<CleanCommitFile>,
    pub total: usize,
    pub filtered_total: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorInfo {
    pub name: String,
    pub commit_count: usize,
    pub n_code_lines_inserted: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyLabels {
    pub field: String,
    pub labels: Vec<String>,
}
