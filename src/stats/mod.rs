//! Aggregation views over the clean commit-file table.
//!
//! - `ops`: fields, operations and the frame interpreter
//! - `definition`: concepts (stability, evolution, specialization, size,
//!   repartition) expanded into operation suites, default and YAML catalogs
//!
//! Used by: the `stats` command and the `/api/v1/stats` routes.

pub mod definition;
pub mod ops;

use std::collections::HashMap;

use serde::Serialize;

use crate::error::Result;
use crate::models::CleanCommitFile;

pub use definition::{default_catalog, load_catalog, Concept, StatCatalog, StatDefinition};
pub use ops::{run, AggFunc, Axis, Field, Freq, Operation, SeriesPoint, StatOutput};

/// Entities below this share of the top entity are left out of the default selection.
pub const MIN_PROP_OF_TOP: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatResult {
    pub id: String,
    pub title: Option<String>,
    pub concept: Concept,
    pub output: StatOutput,
}

pub fn compute(id: &str, definition: &StatDefinition, rows: &[CleanCommitFile]) -> Result<StatResult> {
    let operations = definition.operations()?;
    Ok(StatResult {
        id: id.to_string(),
        title: definition.title.clone(),
        concept: definition.concept,
        output: run(rows, &operations)?,
    })
}

pub fn compute_all(catalog: &StatCatalog, rows: &[CleanCommitFile]) -> Result<Vec<StatResult>> {
    catalog
        .iter()
        .map(|(id, definition)| compute(id, definition, rows))
        .collect()
}

/// Entities of `field` whose code-line total exceeds 10% of the top entity,
/// largest first.
pub fn key_labels(rows: &[CleanCommitFile], field: Field) -> Vec<String> {
    let mut totals: HashMap<String, u64> = HashMap::new();
    for row in rows {
        if let Some(label) = field.label(row) {
            *totals.entry(label).or_insert(0) += u64::from(row.n_code_lines_inserted);
        }
    }

    let mut ranked: Vec<(String, u64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let Some(top) = ranked.first().map(|(_, total)| *total) else {
        return Vec::new();
    };
    let floor = MIN_PROP_OF_TOP * top as f64;

    ranked
        .into_iter()
        .filter(|(_, total)| *total as f64 > floor)
        .map(|(label, _)| label)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn row(author: &str, lines: u32) -> CleanCommitFile {
        CleanCommitFile {
            commit_id: "abc".to_string(),
            file_path: "src/app.py".to_string(),
            ext: "py".to_string(),
            areas: BTreeMap::new(),
            component_nm: None,
            module_nm: None,
            n_lines_inserted: lines,
            n_lines_deleted: 0,
            n_code_lines_inserted: lines,
            n_code_lines_deleted: 0,
            author_nm: author.to_string(),
            creation_dt: Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn key_labels_keep_entities_above_tenth_of_top() {
        let rows = vec![
            row("alice", 600),
            row("alice", 400),
            row("bob", 150),
            row("carol", 100),
            row("dave", 5),
        ];

        assert_eq!(key_labels(&rows, Field::AuthorNm), vec!["alice", "bob"]);
    }

    #[test]
    fn key_labels_skip_empty_cells() {
        assert!(key_labels(&[row("alice", 10)], Field::ModuleNm).is_empty());
        assert!(key_labels(&[], Field::AuthorNm).is_empty());
    }

    #[test]
    fn compute_all_runs_default_catalog() {
        let rows = vec![row("alice", 10), row("bob", 5)];
        let results = compute_all(&default_catalog(false), &rows).unwrap();

        let repartition = results.iter().find(|r| r.id == "author_repartition").unwrap();
        assert_eq!(
            repartition.output,
            StatOutput::Series {
                index: vec!["author_nm".to_string()],
                points: vec![
                    SeriesPoint { key: vec!["alice".to_string()], value: Some(10.0) },
                    SeriesPoint { key: vec!["bob".to_string()], value: Some(5.0) },
                ],
            }
        );
    }
}
