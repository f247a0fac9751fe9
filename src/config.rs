//! Run configuration.
//!
//! A codebase is described by `<config_dir>/<codebase>.yaml`:
//!
//! ```yaml
//! path_to_repo: ../my-repo
//! languages: [py, js]          # optional, defaults to DEFAULT_LANGUAGES
//! author_aliases: aliases.json  # optional override document
//! areas:
//!   src:
//!     root_path: ./src
//!     module_depth: 0
//!     component:
//!       names: [view, model, control]
//!       depth: 0
//!   test:
//!     root_path: ./test
//!     module_depth: 0
//! ```
//!
//! CLI flags override the file (`ConfigOverrides`). The resulting `Settings`
//! value is passed explicitly to every pipeline stage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, Result};

/// Language suffixes recognized as code when no `languages` list is configured.
pub const DEFAULT_LANGUAGES: &[&str] = &["py", "php", "cpp", "cs", "java", "js", "ts", "csproj"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub path_to_repo: Option<PathBuf>,
    pub languages: Option<Vec<String>>,
    pub author_aliases: Option<PathBuf>,
    pub areas: BTreeMap<String, AreaConvention>,
}

/// Directory layout of one area (e.g. `src` or `test`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaConvention {
    pub root_path: String,
    /// Segment index of the module name, counted after the root.
    pub module_depth: usize,
    #[serde(default)]
    pub component: Option<ComponentRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRule {
    pub names: Vec<String>,
    /// Segment index matched against `names`, counted after the root.
    pub depth: usize,
}

/// Everything the path tagger needs: areas in name order plus the language set.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryConvention {
    pub areas: BTreeMap<String, AreaConvention>,
    pub languages: Vec<String>,
}

impl DirectoryConvention {
    pub fn new(areas: BTreeMap<String, AreaConvention>) -> Self {
        Self {
            areas,
            languages: DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect(),
        }
    }

    /// Single `src` area, the shape produced by the `--src-path` flags.
    pub fn single_src(root_path: &str, module_depth: usize, component: Option<ComponentRule>) -> Self {
        let mut areas = BTreeMap::new();
        areas.insert(
            "src".to_string(),
            AreaConvention {
                root_path: root_path.to_string(),
                module_depth,
                component,
            },
        );
        Self::new(areas)
    }

    pub fn has_components(&self) -> bool {
        self.areas.values().any(|a| a.component.is_some())
    }
}

/// Values given on the command line; each one wins over the YAML file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub path_to_repo: Option<PathBuf>,
    pub src_path: Option<String>,
    pub module_depth: Option<usize>,
    pub component_names: Vec<String>,
    pub component_depth: Option<usize>,
}

/// Resolved configuration for one codebase.
#[derive(Debug, Clone)]
pub struct Settings {
    pub codebase_nm: String,
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub repo: RepoConfig,
}

impl Settings {
    /// Load `<config_dir>/<codebase>.yaml` (if present) and apply CLI overrides.
    pub fn load(
        codebase_nm: &str,
        config_dir: &Path,
        data_dir: &Path,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        let mut repo = load_repo_config(&config_dir.join(format!("{}.yaml", codebase_nm)))?;
        apply_overrides(&mut repo, overrides)?;

        Ok(Self {
            codebase_nm: codebase_nm.to_string(),
            config_dir: config_dir.to_path_buf(),
            data_dir: data_dir.to_path_buf(),
            repo,
        })
    }

    /// Required by `parse-git`.
    pub fn repo_path(&self) -> Result<&Path> {
        self.repo.path_to_repo.as_deref().ok_or_else(|| {
            AppError::Config(format!(
                "no repository path for '{}': pass --path-to-repo or set path_to_repo",
                self.codebase_nm
            ))
        })
    }

    /// Required by `prep-data`.
    pub fn convention(&self) -> Result<DirectoryConvention> {
        if self.repo.areas.is_empty() {
            return Err(AppError::Config(format!(
                "no directory convention for '{}': pass --src-path and --module-depth or configure areas",
                self.codebase_nm
            )));
        }

        let mut convention = DirectoryConvention::new(self.repo.areas.clone());
        if let Some(languages) = &self.repo.languages {
            convention.languages = languages.iter().map(|l| l.to_lowercase()).collect();
        }
        Ok(convention)
    }

    /// Configured alias document, or the one written by `authors suggest`.
    pub fn alias_path(&self) -> PathBuf {
        self.repo.author_aliases.clone().unwrap_or_else(|| {
            self.data_dir
                .join(format!("{}_author_nm_merging.json", self.codebase_nm))
        })
    }

    pub fn stats_path(&self) -> PathBuf {
        self.config_dir.join(format!("{}_stats.yaml", self.codebase_nm))
    }
}

fn load_repo_config(path: &Path) -> Result<RepoConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No config file at {}, using command-line values only", path.display());
            return Ok(RepoConfig::default());
        }
        Err(e) => return Err(e.into()),
    };

    serde_yaml::from_str(&content)
        .map_err(|e| AppError::Config(format!("failed to parse {}: {}", path.display(), e)))
}

fn apply_overrides(repo: &mut RepoConfig, overrides: &ConfigOverrides) -> Result<()> {
    if let Some(path) = &overrides.path_to_repo {
        repo.path_to_repo = Some(path.clone());
    }

    let touches_src = overrides.src_path.is_some()
        || overrides.module_depth.is_some()
        || !overrides.component_names.is_empty();
    if !touches_src {
        return Ok(());
    }

    let existing = repo.areas.get("src").cloned();
    let root_path = overrides
        .src_path
        .clone()
        .or_else(|| existing.as_ref().map(|a| a.root_path.clone()))
        .ok_or_else(|| AppError::Config("--src-path is required to define the src area".to_string()))?;
    let module_depth = overrides
        .module_depth
        .or_else(|| existing.as_ref().map(|a| a.module_depth))
        .ok_or_else(|| AppError::Config("--module-depth is required to define the src area".to_string()))?;

    let component = if overrides.component_names.is_empty() {
        existing.and_then(|a| a.component)
    } else {
        let depth = overrides.component_depth.ok_or_else(|| {
            AppError::Config("--component-depth is required with --component-names".to_string())
        })?;
        Some(ComponentRule {
            names: overrides.component_names.clone(),
            depth,
        })
    };

    repo.areas.insert(
        "src".to_string(),
        AreaConvention {
            root_path,
            module_depth,
            component,
        },
    );
    Ok(())
}
