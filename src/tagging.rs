//! Structural tagging of commit files.
//!
//! Given a `DirectoryConvention`, every path gets:
//! - `ext`: recognized language suffix (lowercased) or `other`
//! - `is_<area>`: whether the path starts with the area root
//! - `component_nm`: configured component token found in the component segment
//! - `module_nm`: the module segment, without extension and component token
//!
//! Depths count path segments after the root's own segments.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::config::{AreaConvention, DirectoryConvention};
use crate::models::{area_column, CommitFile, FileTags, OTHER};

const MODULE_SEPARATORS: &[char] = &['.', '_', '-'];

/// Tag every untagged row. A table whose rows are all tagged is returned as-is.
pub fn tag_files(files: Vec<CommitFile>, convention: &DirectoryConvention) -> Vec<CommitFile> {
    if !files.is_empty() && files.iter().all(|f| f.tags.is_some()) {
        debug!("Commit files already tagged, skipping");
        return files;
    }

    let tagger = PathTagger::new(convention);
    files
        .into_iter()
        .map(|mut file| {
            if file.tags.is_none() {
                file.tags = Some(tagger.tag(&file.file_path));
            }
            file
        })
        .collect()
}

pub struct PathTagger {
    languages: HashSet<String>,
    areas: Vec<Area>,
    has_components: bool,
}

struct Area {
    column: String,
    /// Plain string prefix; `None` matches every path (root `.`).
    root: Option<String>,
    /// Segments the root spans, skipped before counting depths.
    root_depth: usize,
    module_depth: usize,
    component: Option<Component>,
}

struct Component {
    names: Vec<String>,
    depth: usize,
    aligned_with_module: bool,
}

impl PathTagger {
    pub fn new(convention: &DirectoryConvention) -> Self {
        let areas: Vec<Area> = convention
            .areas
            .iter()
            .map(|(name, area)| Area::new(name, area))
            .collect();

        Self {
            languages: convention.languages.iter().map(|l| l.to_lowercase()).collect(),
            has_components: areas.iter().any(|a| a.component.is_some()),
            areas,
        }
    }

    pub fn tag(&self, path: &str) -> FileTags {
        let segments: Vec<&str> = path.split('/').collect();

        let mut flags = BTreeMap::new();
        let mut owner: Option<(&Area, &[&str])> = None;
        for area in &self.areas {
            let inside = area.contains(path);
            flags.insert(area.column.clone(), inside);
            if inside && owner.is_none() {
                let relative = segments.get(area.root_depth..).unwrap_or_default();
                owner = Some((area, relative));
            }
        }

        let (component_nm, module_nm) = match owner {
            Some((area, relative)) => (
                self.component_of(area, relative),
                self.module_of(area, relative),
            ),
            None => (self.has_components.then(|| OTHER.to_string()), None),
        };

        FileTags {
            ext: self.extension_of(path),
            areas: flags,
            component_nm,
            module_nm,
        }
    }

    fn extension_of(&self, path: &str) -> String {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        match self.recognized_extension(file_name) {
            Some(ext) => ext,
            None => OTHER.to_string(),
        }
    }

    fn recognized_extension(&self, file_name: &str) -> Option<String> {
        let (_, ext) = file_name.rsplit_once('.')?;
        let ext = ext.to_lowercase();
        self.languages.contains(&ext).then_some(ext)
    }

    fn component_of(&self, area: &Area, relative: &[&str]) -> Option<String> {
        if !self.has_components {
            return None;
        }

        let matched = area.component.as_ref().and_then(|component| {
            let segment = relative.get(component.depth)?.to_lowercase();
            find_token(&segment, &component.names).map(|(_, token)| token.to_string())
        });

        Some(matched.unwrap_or_else(|| OTHER.to_string()))
    }

    fn module_of(&self, area: &Area, relative: &[&str]) -> Option<String> {
        let segment = *relative.get(area.module_depth)?;

        let mut module = segment.to_string();
        if area.module_depth + 1 == relative.len() {
            if let Some((stem, _)) = segment.rsplit_once('.') {
                if self.recognized_extension(segment).is_some() {
                    module = stem.to_string();
                }
            }
        }

        if let Some(component) = area.component.as_ref().filter(|c| c.aligned_with_module) {
            module = strip_tokens(&module, &component.names);
        }

        if module.is_empty() {
            Some(OTHER.to_string())
        } else {
            Some(module)
        }
    }
}

impl Area {
    fn new(name: &str, convention: &AreaConvention) -> Self {
        let root = normalize_root(&convention.root_path);
        let root_depth = root
            .as_deref()
            .map(|r| r.trim_end_matches('/').split('/').count())
            .unwrap_or(0);
        let component = convention.component.as_ref().and_then(|c| {
            let names: Vec<String> = c
                .names
                .iter()
                .map(|n| n.to_lowercase())
                .filter(|n| !n.is_empty())
                .collect();
            (!names.is_empty()).then(|| Component {
                names,
                depth: c.depth,
                aligned_with_module: c.depth == convention.module_depth,
            })
        });

        Self {
            column: area_column(name),
            root,
            root_depth,
            module_depth: convention.module_depth,
            component,
        }
    }

    fn contains(&self, path: &str) -> bool {
        self.root.as_deref().is_none_or(|root| path.starts_with(root))
    }
}

/// A leading `./` or `/` is dropped; `.` (or nothing) is the repository root.
fn normalize_root(root_path: &str) -> Option<String> {
    let root = root_path.trim();
    let root = root
        .strip_prefix("./")
        .or_else(|| root.strip_prefix('/'))
        .unwrap_or(root);

    if root.is_empty() || root == "." {
        return None;
    }
    Some(root.to_string())
}

/// Leftmost occurrence of any token; at equal positions the first configured token wins.
fn find_token<'t>(haystack: &str, tokens: &'t [String]) -> Option<(usize, &'t str)> {
    tokens
        .iter()
        .filter_map(|t| haystack.find(t.as_str()).map(|pos| (pos, t.as_str())))
        .enumerate()
        .min_by_key(|(order, (pos, _))| (*pos, *order))
        .map(|(_, found)| found)
}

/// Remove every component token (ASCII case-insensitive) and the separators left around it.
fn strip_tokens(module: &str, tokens: &[String]) -> String {
    let mut module = module.to_string();
    loop {
        let lowered = module.to_ascii_lowercase();
        match find_token(&lowered, tokens) {
            Some((pos, token)) => module.replace_range(pos..pos + token.len(), ""),
            None => break,
        }
    }
    module.trim_matches(MODULE_SEPARATORS).to_string()
}
