//! Rename resolution for `git log -M` path deltas.
//!
//! Git reports a moved file as `src/{old.py => new.py}` (or `old => new` when
//! the whole path changes). Every occurrence of a path, in every commit, is
//! rewritten to the name the file has at the newest point of the history, so
//! per-module aggregates follow a file across its renames.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::models::CommitFile;

/// Separator between the old and new name inside a rename delta.
pub const DELTA_MARKER: &str = " => ";

static BRACED: OnceLock<Regex> = OnceLock::new();
static WHOLE_PATH: OnceLock<Regex> = OnceLock::new();

fn braced() -> &'static Regex {
    BRACED.get_or_init(|| {
        Regex::new(r"^(?P<prefix>[^{}]*)\{(?P<old>[^{}]*) => (?P<new>[^{}]*)\}(?P<suffix>[^{}]*)$")
            .expect("valid regex")
    })
}

fn whole_path() -> &'static Regex {
    WHOLE_PATH.get_or_init(|| Regex::new(r"^(?P<old>[^{}]+?) => (?P<new>[^{}]+)$").expect("valid regex"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RenameDelta {
    prefix: String,
    old: String,
    new: String,
    suffix: String,
}

impl RenameDelta {
    fn parse(path: &str) -> Option<Self> {
        if let Some(caps) = braced().captures(path) {
            return Some(Self {
                prefix: caps["prefix"].to_string(),
                old: caps["old"].to_string(),
                new: caps["new"].to_string(),
                suffix: caps["suffix"].to_string(),
            });
        }

        whole_path().captures(path).map(|caps| Self {
            prefix: String::new(),
            old: caps["old"].to_string(),
            new: caps["new"].to_string(),
            suffix: String::new(),
        })
    }

    /// A root-level file moved into a directory: the prefix is the old name.
    fn resolve_root_move(mut self) -> Self {
        if self.old.is_empty() && !self.prefix.is_empty() && !self.prefix.contains('/') {
            self.old = std::mem::take(&mut self.prefix);
        }
        self
    }

    fn into_paths(self) -> (String, String) {
        let old = clean_path(&format!("{}{}{}", self.prefix, self.old, self.suffix));
        let new = clean_path(&format!("{}{}{}", self.prefix, self.new, self.suffix));
        (old, new)
    }
}

fn clean_path(path: &str) -> String {
    let mut path = path.to_string();
    while path.contains("//") {
        path = path.replace("//", "/");
    }
    path.trim_start_matches('/').to_string()
}

/// Rewrite every `file_path` to the file's final name.
///
/// Rows holding a delta get the new name first; the collected `old -> new`
/// pairs are then collapsed into `old -> final` and substituted across all rows.
/// Notation that cannot be parsed is left untouched.
pub fn resolve_renames(mut files: Vec<CommitFile>) -> Vec<CommitFile> {
    if !files.iter().any(|f| f.file_path.contains(DELTA_MARKER)) {
        return files;
    }

    let mut renames: Vec<(String, String)> = Vec::new();
    for file in files.iter_mut() {
        if !file.file_path.contains(DELTA_MARKER) {
            continue;
        }
        match RenameDelta::parse(&file.file_path) {
            Some(delta) => {
                let (old, new) = delta.resolve_root_move().into_paths();
                file.file_path = new.clone();
                renames.push((old, new));
            }
            None => warn!("Unresolved rename notation, keeping path as-is: {}", file.file_path),
        }
    }

    let finals = collapse_chains(&renames);
    debug!("Resolved {} renames into {} final paths", renames.len(), finals.len());

    for file in files.iter_mut() {
        if let Some(final_path) = finals.get(&file.file_path) {
            file.file_path = final_path.clone();
        }
    }

    files
}

/// Map every renamed path to the end of its rename chain.
///
/// The log lists newest commits first, so when a path was renamed more than
/// once the first pair seen wins. Cycles (a file renamed back) resolve to the
/// newest target inside the cycle.
fn collapse_chains(renames: &[(String, String)]) -> HashMap<String, String> {
    let mut next: HashMap<&str, &str> = HashMap::new();
    let mut order: HashMap<&str, usize> = HashMap::new();

    for (idx, (old, new)) in renames.iter().enumerate() {
        if old == new {
            continue;
        }
        next.entry(old.as_str()).or_insert(new.as_str());
        order.entry(old.as_str()).or_insert(idx);
    }

    next.keys()
        .map(|&old| (old.to_string(), follow_chain(&next, &order, old)))
        .collect()
}

fn follow_chain(next: &HashMap<&str, &str>, order: &HashMap<&str, usize>, start: &str) -> String {
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(start);
    let mut current = start;

    while let Some(&target) = next.get(current) {
        if !visited.insert(target) {
            let newest = visited
                .iter()
                .filter(|p| next.contains_key(*p))
                .min_by_key(|p| order.get(*p).copied().unwrap_or(usize::MAX))
                .copied()
                .unwrap_or(current);
            return next.get(newest).copied().unwrap_or(current).to_string();
        }
        current = target;
    }

    current.to_string()
}
