//! Author identity resolution.
//!
//! Two mechanisms, applied in order:
//! - explicit override: an alias document (`canonical -> [aliases]`, JSON or YAML)
//!   inverted into `alias -> canonical` and applied as exact replacement
//! - format grouping: `first last`, `f.last`, `first` and `first.last` (lowercased,
//!   email domain stripped) all collapse to `first last`
//!
//! Two different people sharing a first name or an initial are merged; no
//! collision detection is attempted.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::models::Commit;

/// Alias document as stored on disk: canonical name -> known aliases.
pub type AliasDocument = BTreeMap<String, Vec<String>>;

static FULL_NAME: OnceLock<Regex> = OnceLock::new();

fn full_name() -> &'static Regex {
    FULL_NAME.get_or_init(|| Regex::new(r"^(\w+) (\w+)$").expect("valid regex"))
}

/// Lowercase and drop an email domain (`local@domain` -> `local`).
pub fn normalize(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    match lowered.split_once('@') {
        Some((local, _)) => local.to_string(),
        None => lowered,
    }
}

/// Read the override document. A missing file is not an error.
pub fn load_aliases(path: &Path) -> Result<Option<AliasDocument>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No author alias file at {}, skipping overrides", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    let document: std::result::Result<AliasDocument, String> = if is_yaml {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    };

    document
        .map(Some)
        .map_err(|message| AppError::InvalidAliasFile {
            path: path.to_path_buf(),
            message,
        })
}

pub struct AuthorIdentityResolver {
    overrides: HashMap<String, String>,
    formats: HashMap<String, String>,
}

impl AuthorIdentityResolver {
    /// Build the mapping from every observed name and the optional override document.
    pub fn new<'a, I>(observed: I, document: Option<&AliasDocument>) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let overrides = document.map(invert).unwrap_or_default();

        let mut names: Vec<String> = observed
            .into_iter()
            .map(|name| overrides.get(name).map(String::as_str).unwrap_or(name))
            .map(normalize)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        names.sort();

        let mut formats = HashMap::new();
        for name in &names {
            let Some(caps) = full_name().captures(name) else {
                continue;
            };
            let (first, last) = (&caps[1], &caps[2]);
            let initial: String = first.chars().take(1).collect();

            for alternate in [
                format!("{} {}", first, last),
                format!("{}.{}", initial, last),
                first.to_string(),
                format!("{}.{}", first, last),
            ] {
                formats.entry(alternate).or_insert_with(|| name.clone());
            }
        }

        debug!(
            "Author resolver: {} overrides, {} format alternates",
            overrides.len(),
            formats.len()
        );

        Self { overrides, formats }
    }

    pub fn canonical(&self, name: &str) -> String {
        let name = self.overrides.get(name).map(String::as_str).unwrap_or(name);
        match self.formats.get(&normalize(name)) {
            Some(canonical) => canonical.clone(),
            None => name.to_string(),
        }
    }
}

fn invert(document: &AliasDocument) -> HashMap<String, String> {
    document
        .iter()
        .flat_map(|(canonical, aliases)| {
            aliases
                .iter()
                .map(move |alias| (alias.clone(), canonical.clone()))
        })
        .collect()
}

/// Rewrite every `author_nm` to its canonical identity.
pub fn resolve_authors(mut commits: Vec<Commit>, document: Option<&AliasDocument>) -> Vec<Commit> {
    let resolver = AuthorIdentityResolver::new(commits.iter().map(|c| c.author_nm.as_str()), document);

    for commit in commits.iter_mut() {
        commit.author_nm = resolver.canonical(&commit.author_nm);
    }

    let distinct: HashSet<&str> = commits.iter().map(|c| c.author_nm.as_str()).collect();
    info!("Resolved authors to {} identities", distinct.len());

    commits
}

/// Propose an alias document by grouping names whose similarity ratio exceeds `threshold`.
///
/// Names are visited in the given order; each unclaimed name becomes the
/// canonical entry for every later unclaimed name close enough to it. Entries
/// without aliases are dropped.
pub fn suggest_aliases<'a, I>(names: I, threshold: u8) -> AliasDocument
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let distinct: Vec<&str> = names.into_iter().filter(|n| seen.insert(*n)).collect();

    let mut claimed: HashSet<&str> = HashSet::new();
    let mut document = AliasDocument::new();

    for (idx, &name) in distinct.iter().enumerate() {
        if !claimed.insert(name) {
            continue;
        }

        let aliases: Vec<&str> = distinct[idx + 1..]
            .iter()
            .copied()
            .filter(|other| !claimed.contains(other))
            .filter(|other| similarity(name, other) > u32::from(threshold))
            .collect();

        if aliases.is_empty() {
            continue;
        }
        claimed.extend(aliases.iter().copied());
        document.insert(
            name.to_string(),
            aliases.into_iter().map(str::to_string).collect(),
        );
    }

    document
}

/// Indel similarity in percent: `2 * lcs / (len(a) + len(b))`, rounded.
pub fn similarity(a: &str, b: &str) -> u32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }

    let mut row = vec![0usize; b.len() + 1];
    for ca in &a {
        let mut diagonal = 0;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diagonal + 1
            } else {
                above.max(row[j])
            };
            diagonal = above;
        }
    }
    let lcs = row[b.len()];

    ((200 * lcs + total / 2) / total) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(author: &str) -> Commit {
        Commit {
            id: "abc".to_string(),
            creation_dt: "2021-09-30 15:12:01 +0200".to_string(),
            author_nm: author.to_string(),
            msg: String::new(),
        }
    }

    fn authors(names: &[&str], document: Option<&AliasDocument>) -> Vec<String> {
        resolve_authors(names.iter().map(|n| commit(n)).collect(), document)
            .into_iter()
            .map(|c| c.author_nm)
            .collect()
    }

    #[test]
    fn normalize_strips_domain() {
        assert_eq!(normalize("B.Lebricolo@work.com"), "b.lebricolo");
        assert_eq!(normalize("Bob Lebricolo"), "bob lebricolo");
    }

    #[test]
    fn name_formats_collapse_to_first_last() {
        let resolved = authors(
            &["Bob Lebricolo", "bob lebricolo", "b.lebricolo", "b.lebricolo@work.com"],
            None,
        );
        assert_eq!(resolved, vec!["bob lebricolo"; 4]);
    }

    #[test]
    fn first_name_and_dotted_forms_collapse() {
        let resolved = authors(&["Alice Martin", "alice", "alice.martin@corp.io"], None);
        assert_eq!(resolved, vec!["alice martin"; 3]);
    }

    #[test]
    fn unmatched_names_pass_through() {
        let resolved = authors(&["PHPeter", "laucho"], None);
        assert_eq!(resolved, vec!["PHPeter", "laucho"]);
    }

    #[test]
    fn override_applies_before_format_grouping() {
        let mut document = AliasDocument::new();
        document.insert("Bob Lebricolo".to_string(), vec!["bricoleur".to_string()]);

        let resolved = authors(&["bricoleur", "b.lebricolo"], Some(&document));
        assert_eq!(resolved, vec!["bob lebricolo"; 2]);
    }

    #[test]
    fn override_only_names_are_replaced_exactly() {
        let mut document = AliasDocument::new();
        document.insert("PHPeter".to_string(), vec!["peter-ph".to_string()]);

        let resolved = authors(&["peter-ph", "Peter-PH"], Some(&document));
        assert_eq!(resolved, vec!["PHPeter", "Peter-PH"]);
    }

    #[test]
    fn missing_alias_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_aliases(&dir.path().join("aliases.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn invalid_alias_file_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_aliases(&path).unwrap_err();
        assert!(matches!(err, AppError::InvalidAliasFile { .. }));
        assert!(err.to_string().contains("aliases.json"));
    }

    #[test]
    fn yaml_alias_file_is_read_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.yaml");
        std::fs::write(&path, "Bob Lebricolo:\n  - bricoleur\n  - bob_l\n").unwrap();

        let document = load_aliases(&path).unwrap().unwrap();
        assert_eq!(document["Bob Lebricolo"], vec!["bricoleur", "bob_l"]);
    }

    #[test]
    fn similarity_ratio() {
        assert_eq!(similarity("abc", "abc"), 100);
        assert_eq!(similarity("abc", "xyz"), 0);
        assert_eq!(similarity("jean dupont", "jean dupond"), 91);
    }

    #[test]
    fn suggestions_group_close_spellings() {
        let document = suggest_aliases(
            ["jean dupont", "laucho", "jean dupond", "Jean Dupont", "laucho"],
            80,
        );

        assert_eq!(document.len(), 1);
        assert_eq!(document["jean dupont"], vec!["jean dupond", "Jean Dupont"]);
    }

    #[test]
    fn suggested_document_merges_raw_spellings() {
        let observed = ["Bob Lebricolo", "Bob Lebricollo", "Bob Lebricolo"];
        let document = suggest_aliases(observed, 80);
        assert_eq!(document["Bob Lebricolo"], vec!["Bob Lebricollo"]);

        let resolved = authors(&observed, Some(&document));
        assert_eq!(resolved, vec!["bob lebricolo"; 3]);
    }
}
