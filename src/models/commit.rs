use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sentinel used for files or components that fall outside every known category.
pub const OTHER: &str = "other";

/// One commit as read from the log export (raw stage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    pub creation_dt: String,
    pub author_nm: String,
    pub msg: String,
}

/// One (commit, file) pair. `tags` is filled by the path tagger and never persisted
/// in the raw stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFile {
    pub commit_id: String,
    pub file_path: String,
    pub n_lines_inserted: u32,
    pub n_lines_deleted: u32,
    #[serde(skip)]
    pub tags: Option<FileTags>,
}

impl CommitFile {
    pub fn new(commit_id: &str, file_path: &str, n_lines_inserted: u32, n_lines_deleted: u32) -> Self {
        Self {
            commit_id: commit_id.to_string(),
            file_path: file_path.to_string(),
            n_lines_inserted,
            n_lines_deleted,
            tags: None,
        }
    }
}

/// Structural classification of a file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTags {
    pub ext: String,
    /// `is_<area>` column name -> membership.
    pub areas: BTreeMap<String, bool>,
    /// `None` when no component vocabulary is configured.
    pub component_nm: Option<String>,
    pub module_nm: Option<String>,
}

impl FileTags {
    pub fn is_in(&self, area: &str) -> bool {
        self.areas.get(&area_column(area)).copied().unwrap_or(false)
    }
}

/// Column name holding the membership flag of an area (`src` -> `is_src`).
pub fn area_column(area: &str) -> String {
    format!("is_{}", area)
}
