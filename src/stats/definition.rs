//! Stat definitions: a concept plus its parameters, expanded into operations.
//!
//! Custom definitions live in `<config_dir>/<codebase>_stats.yaml`:
//!
//! ```yaml
//! module_stability:
//!   title: Who keeps touching which module
//!   concept: stability
//!   measure: n_code_lines_inserted
//!   entity: [module_nm]
//!   freq: month
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::ops::{AggFunc, Axis, Field, Freq, Operation};
use crate::error::{AppError, Result};

/// Definitions by id, in id order.
pub type StatCatalog = BTreeMap<String, StatDefinition>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concept {
    Stability,
    Evolution,
    Specialization,
    Size,
    Repartition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatDefinition {
    #[serde(default)]
    pub title: Option<String>,
    pub concept: Concept,
    pub measure: Field,
    #[serde(default)]
    pub entity: Vec<Field>,
    #[serde(default)]
    pub func: AggFunc,
    #[serde(default)]
    pub freq: Freq,
    #[serde(default)]
    pub normalize_axis: Axis,
    /// Replaces the concept's operation suite when given.
    #[serde(default)]
    pub operations: Option<Vec<Operation>>,
}

impl StatDefinition {
    pub fn new(concept: Concept, measure: Field, entity: Vec<Field>) -> Self {
        Self {
            title: None,
            concept,
            measure,
            entity,
            func: AggFunc::Sum,
            freq: Freq::Month,
            normalize_axis: Axis::Columns,
            operations: None,
        }
    }

    fn with_func(mut self, func: AggFunc) -> Self {
        self.func = func;
        self
    }

    fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn operations(&self) -> Result<Vec<Operation>> {
        if let Some(operations) = &self.operations {
            return Ok(operations.clone());
        }

        let min_entities = match self.concept {
            Concept::Evolution => 0,
            Concept::Specialization => 2,
            Concept::Stability | Concept::Size | Concept::Repartition => 1,
        };
        if self.entity.len() < min_entities {
            return Err(AppError::InvalidPipeline(format!(
                "{:?} needs at least {} entity field(s), got {}",
                self.concept,
                min_entities,
                self.entity.len()
            )));
        }

        let group = Operation::Group {
            fields: self.entity.clone(),
        };
        let resample = Operation::Resample { freq: self.freq };
        let aggregate = Operation::Aggregate {
            measure: self.measure,
            func: self.func,
        };
        let shares = [
            Operation::Pivot,
            Operation::Normalize {
                axis: self.normalize_axis,
            },
            Operation::Round { decimals: 2 },
            Operation::Replace { from: 0.0, to: None },
        ];

        let operations = match self.concept {
            Concept::Stability => [vec![group, resample, aggregate], shares.to_vec()].concat(),
            Concept::Specialization => [vec![group, aggregate], shares.to_vec()].concat(),
            Concept::Evolution if self.entity.is_empty() => vec![resample, aggregate],
            Concept::Evolution => vec![group, resample, aggregate],
            Concept::Size | Concept::Repartition => vec![group, aggregate],
        };
        Ok(operations)
    }
}

/// Built-in dashboard definitions; component views only when components are tagged.
pub fn default_catalog(has_components: bool) -> StatCatalog {
    use Field::*;

    let mut catalog = StatCatalog::new();
    catalog.insert(
        "module_stability".to_string(),
        StatDefinition::new(Concept::Stability, NCodeLinesInserted, vec![ModuleNm])
            .titled("Monthly share of code written per module"),
    );
    catalog.insert(
        "author_specialization".to_string(),
        StatDefinition::new(Concept::Specialization, NCodeLinesInserted, vec![AuthorNm, ModuleNm])
            .titled("Share of each module written by each author"),
    );
    catalog.insert(
        "code_evolution".to_string(),
        StatDefinition::new(Concept::Evolution, NCodeLinesInserted, Vec::new())
            .titled("Code lines inserted per month"),
    );
    catalog.insert(
        "commit_evolution".to_string(),
        StatDefinition::new(Concept::Evolution, CommitId, Vec::new())
            .with_func(AggFunc::Nunique)
            .titled("Commits per month"),
    );
    catalog.insert(
        "module_size".to_string(),
        StatDefinition::new(Concept::Size, NCodeLinesInserted, vec![ModuleNm])
            .titled("Code lines inserted per module"),
    );
    catalog.insert(
        "author_repartition".to_string(),
        StatDefinition::new(Concept::Repartition, NCodeLinesInserted, vec![AuthorNm])
            .titled("Code lines inserted per author"),
    );
    catalog.insert(
        "ext_repartition".to_string(),
        StatDefinition::new(Concept::Repartition, NLinesInserted, vec![Ext])
            .titled("Lines inserted per extension"),
    );

    if has_components {
        catalog.insert(
            "component_repartition".to_string(),
            StatDefinition::new(Concept::Repartition, NCodeLinesInserted, vec![ComponentNm])
                .titled("Code lines inserted per component"),
        );
        catalog.insert(
            "component_specialization".to_string(),
            StatDefinition::new(
                Concept::Specialization,
                NCodeLinesInserted,
                vec![AuthorNm, ComponentNm],
            )
            .titled("Share of each component written by each author"),
        );
    }

    catalog
}

/// Read a custom catalog. A missing file is an error.
pub fn load_catalog(path: &Path) -> Result<StatCatalog> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("cannot read stats file {}: {}", path.display(), e))
    })?;

    let catalog: StatCatalog = serde_yaml::from_str(&content)
        .map_err(|e| AppError::Config(format!("failed to parse {}: {}", path.display(), e)))?;

    info!("Loaded {} stat definitions from {}", catalog.len(), path.display());
    Ok(catalog)
}
