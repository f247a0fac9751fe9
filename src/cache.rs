//! In-memory dataset cache for the `serve` API.
//!
//! - Clean tables loaded once, commits kept newest first
//! - Module contributor rankings built lazily per module, then instant lookups
//! - Cache invalidation: compares the clean files' mtime on each request
//!
//! Used by: every handler in `routes`

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime};

use tracing::info;

use crate::error::{AppError, Result};
use crate::git::repository::format_relative_time;
use crate::models::{
    CleanCommit, CleanCommitFile, CommitFileListResponse, CommitListResponse, CommitSummary,
    ContributorInfo, DatasetInfo, KeyLabels,
};
use crate::stats::{self, Field, StatCatalog, StatResult};
use crate::store::DataStore;

pub type SharedDataset = Arc<Dataset>;

/// File-row filters of `GET /api/v1/commit-files`.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    pub module: Option<String>,
    pub component: Option<String>,
    pub ext: Option<String>,
}

impl FileFilter {
    fn matches(&self, file: &CleanCommitFile) -> bool {
        let same = |wanted: &Option<String>, actual: Option<&str>| {
            wanted.as_deref().is_none_or(|w| actual == Some(w))
        };
        same(&self.module, file.module_nm.as_deref())
            && same(&self.component, file.component_nm.as_deref())
            && same(&self.ext, Some(file.ext.as_str()))
    }
}

pub struct Dataset {
    pub codebase_nm: String,
    store: DataStore,
    /// Custom stat definitions; the default catalog is used when `None`.
    catalog: Option<StatCatalog>,
    cache: Mutex<Option<DatasetCache>>,
}

impl Dataset {
    pub fn new(codebase_nm: &str, store: DataStore, catalog: Option<StatCatalog>) -> Self {
        Self {
            codebase_nm: codebase_nm.to_string(),
            store,
            catalog,
            cache: Mutex::new(None),
        }
    }

    /// Run `f` against a cache that matches the clean files on disk.
    pub fn with_cache<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut DatasetCache) -> Result<T>,
    {
        let mut guard = self
            .cache
            .lock()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;

        let modified = self.store.clean_modified()?;
        let stale = guard.as_ref().is_none_or(|cache| !cache.is_valid(modified));
        if stale {
            let start = Instant::now();
            let (commits, files) = self.store.load_clean()?;
            let cache = DatasetCache::build(commits, files, modified);
            info!(
                "Dataset cache built: {} commits, {} files in {:?}",
                cache.commits.len(),
                cache.files.len(),
                start.elapsed()
            );
            *guard = Some(cache);
        }

        match guard.as_mut() {
            Some(cache) => f(cache),
            None => Err(AppError::Internal("dataset cache missing".to_string())),
        }
    }

    pub fn info(&self) -> Result<DatasetInfo> {
        self.with_cache(|cache| Ok(cache.info(&self.codebase_nm)))
    }

    pub fn stats(&self) -> Result<Vec<StatResult>> {
        self.with_cache(|cache| {
            let catalog = self.catalog_for(cache);
            stats::compute_all(&catalog, &cache.files)
        })
    }

    pub fn stat(&self, id: &str) -> Result<StatResult> {
        self.with_cache(|cache| {
            let catalog = self.catalog_for(cache);
            let definition = catalog
                .get(id)
                .ok_or_else(|| AppError::NotFound(format!("stat '{}'", id)))?;
            stats::compute(id, definition, &cache.files)
        })
    }

    fn catalog_for(&self, cache: &DatasetCache) -> StatCatalog {
        match &self.catalog {
            Some(catalog) => catalog.clone(),
            None => stats::default_catalog(cache.has_components()),
        }
    }
}

pub struct DatasetCache {
    /// Newest first.
    pub commits: Vec<CleanCommit>,
    pub files: Vec<CleanCommitFile>,
    /// Ranking over all commits.
    pub contributors: Vec<ContributorInfo>,
    /// module -> ranking (lazily populated)
    pub module_contributors: HashMap<String, Vec<ContributorInfo>>,
    pub modified: SystemTime,
    pub created_at: Instant,
}

impl DatasetCache {
    pub fn build(
        mut commits: Vec<CleanCommit>,
        files: Vec<CleanCommitFile>,
        modified: SystemTime,
    ) -> Self {
        commits.sort_by(|a, b| b.creation_dt.cmp(&a.creation_dt));
        let contributors = rank(
            commits
                .iter()
                .map(|c| (c.author_nm.as_str(), c.id.as_str(), c.n_code_lines_inserted)),
        );

        Self {
            commits,
            files,
            contributors,
            module_contributors: HashMap::new(),
            modified,
            created_at: Instant::now(),
        }
    }

    pub fn is_valid(&self, modified: SystemTime) -> bool {
        self.modified == modified
    }

    pub fn has_components(&self) -> bool {
        self.files.iter().any(|f| f.component_nm.is_some())
    }

    pub fn info(&self, codebase_nm: &str) -> DatasetInfo {
        let areas: BTreeSet<String> = self
            .files
            .iter()
            .flat_map(|f| f.areas.keys())
            .map(|column| column.trim_start_matches("is_").to_string())
            .collect();

        DatasetInfo {
            codebase_nm: codebase_nm.to_string(),
            n_commits: self.commits.len(),
            n_commit_files: self.files.len(),
            first_commit_dt: self.commits.last().map(|c| c.creation_dt),
            last_commit_dt: self.commits.first().map(|c| c.creation_dt),
            areas: areas.into_iter().collect(),
            has_components: self.has_components(),
            cache_age_secs: self.created_at.elapsed().as_secs(),
        }
    }

    /// Paginated commits, optionally restricted to one author (fast, all in-memory).
    pub fn query_commits(&self, author: Option<&str>, limit: usize, offset: usize) -> CommitListResponse {
        let total = self.commits.len();

        let filtered: Vec<&CleanCommit> = self
            .commits
            .iter()
            .filter(|c| author.is_none_or(|a| c.author_nm == a))
            .collect();
        let filtered_total = filtered.len();

        let commits = filtered
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|c| CommitSummary {
                id: c.id.clone(),
                msg: c.msg.clone(),
                author_nm: c.author_nm.clone(),
                creation_dt: c.creation_dt,
                relative_time: format_relative_time(c.creation_dt.timestamp()),
                n_code_lines_inserted: c.n_code_lines_inserted,
            })
            .collect();

        CommitListResponse {
            commits,
            total,
            filtered_total,
            has_more: filtered_total > offset.saturating_add(limit),
            contributors: self.contributors.clone(),
        }
    }

    pub fn query_files(&self, filter: &FileFilter, limit: usize, offset: usize) -> CommitFileListResponse {
        let total = self.files.len();
        let filtered: Vec<&CleanCommitFile> = self.files.iter().filter(|f| filter.matches(f)).collect();
        let filtered_total = filtered.len();

        CommitFileListResponse {
            files: filtered.into_iter().skip(offset).take(limit).cloned().collect(),
            total,
            filtered_total,
            has_more: filtered_total > offset.saturating_add(limit),
        }
    }

    /// Contributors of one module, built on first request.
    pub fn contributors_for_module(&mut self, module: &str) -> Result<Vec<ContributorInfo>> {
        if let Some(contributors) = self.module_contributors.get(module) {
            return Ok(contributors.clone());
        }

        info!("Building contributor cache for module: {}", module);
        let rows: Vec<&CleanCommitFile> = self
            .files
            .iter()
            .filter(|f| f.module_nm.as_deref() == Some(module))
            .collect();
        if rows.is_empty() {
            return Err(AppError::NotFound(format!("module '{}'", module)));
        }

        let contributors = rank(
            rows.iter()
                .map(|f| (f.author_nm.as_str(), f.commit_id.as_str(), f.n_code_lines_inserted)),
        );
        self.module_contributors
            .insert(module.to_string(), contributors.clone());
        Ok(contributors)
    }

    pub fn key_labels(&self, field: Field) -> KeyLabels {
        KeyLabels {
            field: field.name().to_string(),
            labels: stats::key_labels(&self.files, field),
        }
    }
}

/// Rank authors by distinct commits, then code lines, then name.
fn rank<'a, I>(entries: I) -> Vec<ContributorInfo>
where
    I: Iterator<Item = (&'a str, &'a str, u32)>,
{
    let mut by_author: HashMap<&str, (BTreeSet<&str>, u64)> = HashMap::new();
    for (author, commit_id, code_lines) in entries {
        let entry = by_author.entry(author).or_default();
        entry.0.insert(commit_id);
        entry.1 += u64::from(code_lines);
    }

    let mut contributors: Vec<ContributorInfo> = by_author
        .into_iter()
        .map(|(name, (commit_ids, n_code_lines_inserted))| ContributorInfo {
            name: name.to_string(),
            commit_count: commit_ids.len(),
            n_code_lines_inserted,
        })
        .collect();
    contributors.sort_by(|a, b| {
        b.commit_count
            .cmp(&a.commit_count)
            .then_with(|| b.n_code_lines_inserted.cmp(&a.n_code_lines_inserted))
            .then_with(|| a.name.cmp(&b.name))
    });
    contributors
}
