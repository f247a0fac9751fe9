//! Typed rows of the clean stage.
//!
//! These are the tables handed to the aggregation layer and the HTTP API:
//! ids and text as strings, counts as `u32`, flags as `bool`, timestamps as
//! timezone-aware UTC datetimes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::commit::area_column;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanCommit {
    pub id: String,
    pub creation_dt: DateTime<Utc>,
    pub author_nm: String,
    pub msg: String,
    pub n_code_lines_inserted: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanCommitFile {
    pub commit_id: String,
    pub file_path: String,
    pub ext: String,
    #[serde(flatten)]
    pub areas: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_nm: Option<String>,
    pub module_nm: Option<String>,
    pub n_lines_inserted: u32,
    pub n_lines_deleted: u32,
    pub n_code_lines_inserted: u32,
    pub n_code_lines_deleted: u32,
    pub author_nm: String,
    pub creation_dt: DateTime<Utc>,
}

impl CleanCommitFile {
    pub fn is_in(&self, area: &str) -> bool {
        self.areas.get(&area_column(area)).copied().unwrap_or(false)
    }

    pub fn is_src(&self) -> bool {
        self.is_in("src")
    }
}
