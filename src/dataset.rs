//! Final assembly of the clean tables.
//!
//! - code-line columns: raw counts, zeroed for files whose `ext` is `other`
//! - commit aggregate: `n_code_lines_inserted` summed over the commit's files
//! - author and date denormalized onto file rows (validated many-to-one join)
//! - timestamps parsed to UTC

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::{CleanCommit, CleanCommitFile, Commit, CommitFile, FileTags, OTHER};

/// `%ad` with `--date=iso`, e.g. `2019-05-30 12:26:49 +0200`.
const ISO_LOG_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

pub fn parse_timestamp(commit_id: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_str(value.trim(), ISO_LOG_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value.trim()))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::InvalidTimestamp {
            commit_id: commit_id.to_string(),
            value: value.to_string(),
        })
}

/// Build the clean tables. Every file row must reference exactly one commit.
pub fn assemble(
    commits: Vec<Commit>,
    files: Vec<CommitFile>,
) -> Result<(Vec<CleanCommit>, Vec<CleanCommitFile>)> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(commits.len());
    let mut duplicates: HashMap<&str, usize> = HashMap::new();
    for (pos, commit) in commits.iter().enumerate() {
        if index.insert(commit.id.as_str(), pos).is_some() {
            *duplicates.entry(commit.id.as_str()).or_insert(1) += 1;
        }
    }

    let creation_dts = commits
        .iter()
        .map(|c| parse_timestamp(&c.id, &c.creation_dt))
        .collect::<Result<Vec<_>>>()?;

    let mut code_lines = vec![0u32; commits.len()];
    let mut clean_files = Vec::with_capacity(files.len());

    for file in files {
        if let Some(&matches) = duplicates.get(file.commit_id.as_str()) {
            return Err(AppError::JoinCardinality {
                commit_id: file.commit_id,
                matches,
            });
        }
        let Some(&pos) = index.get(file.commit_id.as_str()) else {
            return Err(AppError::JoinCardinality {
                commit_id: file.commit_id,
                matches: 0,
            });
        };

        let clean = clean_file(file, &commits[pos].author_nm, creation_dts[pos]);
        code_lines[pos] = code_lines[pos].saturating_add(clean.n_code_lines_inserted);
        clean_files.push(clean);
    }

    let clean_commits: Vec<CleanCommit> = commits
        .into_iter()
        .zip(creation_dts)
        .zip(code_lines)
        .map(|((commit, creation_dt), n_code_lines_inserted)| CleanCommit {
            id: commit.id,
            creation_dt,
            author_nm: commit.author_nm,
            msg: commit.msg,
            n_code_lines_inserted,
        })
        .collect();

    info!(
        "Assembled {} commits and {} commit files",
        clean_commits.len(),
        clean_files.len()
    );

    Ok((clean_commits, clean_files))
}

fn clean_file(file: CommitFile, author_nm: &str, creation_dt: DateTime<Utc>) -> CleanCommitFile {
    let tags = file.tags.unwrap_or_else(|| FileTags {
        ext: OTHER.to_string(),
        areas: Default::default(),
        component_nm: None,
        module_nm: None,
    });
    let is_code = tags.ext != OTHER;

    CleanCommitFile {
        commit_id: file.commit_id,
        file_path: file.file_path,
        ext: tags.ext,
        areas: tags.areas,
        component_nm: tags.component_nm,
        module_nm: tags.module_nm,
        n_lines_inserted: file.n_lines_inserted,
        n_lines_deleted: file.n_lines_deleted,
        n_code_lines_inserted: if is_code { file.n_lines_inserted } else { 0 },
        n_code_lines_deleted: if is_code { file.n_lines_deleted } else { 0 },
        author_nm: author_nm.to_string(),
        creation_dt,
    }
}
