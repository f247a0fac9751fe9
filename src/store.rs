//! On-disk tables.
//!
//! One JSON Lines file per table under the data directory:
//! - `<codebase>_raw_commit.jsonl`, `<codebase>_raw_commit_file.jsonl` (parse-git)
//! - `<codebase>_clean_commit.jsonl`, `<codebase>_clean_commit_file.jsonl` (prep-data)
//!
//! Both tables of a stage are staged as `.tmp` siblings, then renamed into place.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::{CleanCommit, CleanCommitFile, Commit, CommitFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Raw,
    Clean,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::Raw => "raw",
            Stage::Clean => "clean",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataStore {
    data_dir: PathBuf,
    codebase_nm: String,
}

impl DataStore {
    pub fn new(data_dir: impl Into<PathBuf>, codebase_nm: &str) -> Self {
        Self {
            data_dir: data_dir.into(),
            codebase_nm: codebase_nm.to_string(),
        }
    }

    pub fn table_path(&self, stage: Stage, table: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}_{}_{}.jsonl", self.codebase_nm, stage.as_str(), table))
    }

    fn commit_path(&self, stage: Stage) -> PathBuf {
        self.table_path(stage, "commit")
    }

    fn commit_file_path(&self, stage: Stage) -> PathBuf {
        self.table_path(stage, "commit_file")
    }

    pub fn has(&self, stage: Stage) -> bool {
        self.commit_path(stage).exists() && self.commit_file_path(stage).exists()
    }

    pub fn save_raw(&self, commits: &[Commit], files: &[CommitFile]) -> Result<()> {
        self.write_tables(Stage::Raw, commits, files)
    }

    pub fn load_raw(&self) -> Result<(Vec<Commit>, Vec<CommitFile>)> {
        self.ensure(Stage::Raw)?;
        Ok((
            read_table(&self.commit_path(Stage::Raw))?,
            read_table(&self.commit_file_path(Stage::Raw))?,
        ))
    }

    pub fn save_clean(&self, commits: &[CleanCommit], files: &[CleanCommitFile]) -> Result<()> {
        self.write_tables(Stage::Clean, commits, files)
    }

    pub fn load_clean(&self) -> Result<(Vec<CleanCommit>, Vec<CleanCommitFile>)> {
        self.ensure(Stage::Clean)?;
        Ok((
            read_table(&self.commit_path(Stage::Clean))?,
            read_table(&self.commit_file_path(Stage::Clean))?,
        ))
    }

    /// Latest modification time of the clean tables.
    pub fn clean_modified(&self) -> Result<SystemTime> {
        self.ensure(Stage::Clean)?;
        let commits = fs::metadata(self.commit_path(Stage::Clean))?.modified()?;
        let files = fs::metadata(self.commit_file_path(Stage::Clean))?.modified()?;
        Ok(commits.max(files))
    }

    /// Both tables are fully written before either replaces the current one.
    fn write_tables<C: Serialize, F: Serialize>(&self, stage: Stage, commits: &[C], files: &[F]) -> Result<()> {
        let commit_path = self.commit_path(stage);
        let file_path = self.commit_file_path(stage);

        let commit_tmp = stage_table(&commit_path, commits)?;
        let file_tmp = match stage_table(&file_path, files) {
            Ok(tmp) => tmp,
            Err(e) => {
                let _ = fs::remove_file(&commit_tmp);
                return Err(e);
            }
        };

        fs::rename(&commit_tmp, &commit_path)?;
        fs::rename(&file_tmp, &file_path)?;
        debug!("Wrote {} tables for '{}'", stage.as_str(), self.codebase_nm);
        Ok(())
    }

    fn ensure(&self, stage: Stage) -> Result<()> {
        if self.has(stage) {
            Ok(())
        } else {
            Err(AppError::DatasetNotFound(format!(
                "no {} tables for '{}' in {}",
                stage.as_str(),
                self.codebase_nm,
                self.data_dir.display()
            )))
        }
    }
}

/// Write `rows` next to `path` as `.jsonl.tmp` and return the temp path.
fn stage_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("jsonl.tmp");
    let mut writer = BufWriter::new(File::create(&tmp)?);
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    debug!("Staged {} rows for {}", rows.len(), path.display());
    Ok(tmp)
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let reader = BufReader::new(File::open(path)?);

    let mut rows = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        rows.push(serde_json::from_str(&line)?);
    }

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}
