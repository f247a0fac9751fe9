//! Command-level stages and their chaining.
//!
//! - `parse_git`: log export -> raw tables
//! - `prepare_data`: raw tables -> rename, tag, authors, assemble -> clean tables
//! - `prepare_tables`: the pure core of `prepare_data`
//! - `suggest_author_aliases`: near-duplicate author names -> alias document
//!
//! A stage whose input tables are missing (or `rerun` is set) runs its
//! predecessor first. Every fatal error is raised before anything is written.

use std::path::PathBuf;

use tracing::info;

use crate::authors::{self, AliasDocument};
use crate::config::{DirectoryConvention, Settings};
use crate::dataset;
use crate::error::Result;
use crate::git::{self, GitRepository, ParsedLog};
use crate::models::{CleanCommit, CleanCommitFile, Commit, CommitFile};
use crate::store::{DataStore, Stage};
use crate::tagging;

pub fn store_for(settings: &Settings) -> DataStore {
    DataStore::new(&settings.data_dir, &settings.codebase_nm)
}

/// Export, parse and persist the raw stage.
pub fn parse_git(settings: &Settings) -> Result<ParsedLog> {
    let repo = GitRepository::open(settings.repo_path()?)?;
    info!("Exporting log of {}", repo.workdir.display());

    let log = repo.export_log()?;
    let parsed = git::parse_log(&log)?;

    store_for(settings).save_raw(&parsed.commits, &parsed.files)?;
    info!(
        "Parsed {} commits, {} commit files for '{}'",
        parsed.commits.len(),
        parsed.files.len(),
        settings.codebase_nm
    );

    Ok(parsed)
}

/// Build and persist the clean stage.
pub fn prepare_data(
    settings: &Settings,
    rerun: bool,
) -> Result<(Vec<CleanCommit>, Vec<CleanCommitFile>)> {
    let convention = settings.convention()?;
    let store = store_for(settings);

    let (commits, files) = if rerun || !store.has(Stage::Raw) {
        info!("Raw tables missing or rerun requested, running parse-git first");
        let parsed = parse_git(settings)?;
        (parsed.commits, parsed.files)
    } else {
        store.load_raw()?
    };

    let aliases = authors::load_aliases(&settings.alias_path())?;
    let (clean_commits, clean_files) =
        prepare_tables(commits, files, &convention, aliases.as_ref())?;

    store.save_clean(&clean_commits, &clean_files)?;
    info!("Clean dataset written for '{}'", settings.codebase_nm);

    Ok((clean_commits, clean_files))
}

/// Load the clean stage, building it first when missing (or `rerun`).
pub fn load_or_prepare(
    settings: &Settings,
    rerun: bool,
) -> Result<(Vec<CleanCommit>, Vec<CleanCommitFile>)> {
    let store = store_for(settings);
    if rerun || !store.has(Stage::Clean) {
        info!("Clean tables missing or rerun requested, running prep-data first");
        return prepare_data(settings, rerun);
    }
    store.load_clean()
}

/// Write an alias document proposing merges of similar author names.
pub fn suggest_author_aliases(settings: &Settings, threshold: u8) -> Result<(PathBuf, AliasDocument)> {
    let store = store_for(settings);
    let commits = if store.has(Stage::Raw) {
        store.load_raw()?.0
    } else {
        parse_git(settings)?.commits
    };

    let document = authors::suggest_aliases(commits.iter().map(|c| c.author_nm.as_str()), threshold);

    let path = settings.alias_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, serde_json::to_string_pretty(&document)?)?;
    info!("Suggested {} alias groups in {}", document.len(), path.display());

    Ok((path, document))
}

pub fn prepare_tables(
    commits: Vec<Commit>,
    files: Vec<CommitFile>,
    convention: &DirectoryConvention,
    aliases: Option<&AliasDocument>,
) -> Result<(Vec<CleanCommit>, Vec<CleanCommitFile>)> {
    let files = git::resolve_renames(files);
    let files = tagging::tag_files(files, convention);
    let commits = authors::resolve_authors(commits, aliases);
    dataset::assemble(commits, files)
}

/// Parse a log export and run every stage in memory.
pub fn prepare_from_log(
    log: &str,
    convention: &DirectoryConvention,
    aliases: Option<&AliasDocument>,
) -> Result<(Vec<CleanCommit>, Vec<CleanCommitFile>)> {
    let parsed = git::parse_log(log)?;
    prepare_tables(parsed.commits, parsed.files, convention, aliases)
}
