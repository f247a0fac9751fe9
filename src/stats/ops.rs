//! Aggregation operations and their interpreter.
//!
//! A pipeline walks the clean file rows through three frame shapes:
//!
//! ```text
//! rows --group/resample--> rows (keyed) --aggregate--> series --pivot--> matrix
//! ```
//!
//! `round` and `replace` apply to series and matrices, `normalize` to matrices
//! only. Any other combination is an `InvalidPipeline` error.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::CleanCommitFile;

/// Columns of the clean commit-file table usable in a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    AuthorNm,
    ModuleNm,
    ComponentNm,
    Ext,
    FilePath,
    CommitId,
    NLinesInserted,
    NLinesDeleted,
    NCodeLinesInserted,
    NCodeLinesDeleted,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::AuthorNm => "author_nm",
            Field::ModuleNm => "module_nm",
            Field::ComponentNm => "component_nm",
            Field::Ext => "ext",
            Field::FilePath => "file_path",
            Field::CommitId => "commit_id",
            Field::NLinesInserted => "n_lines_inserted",
            Field::NLinesDeleted => "n_lines_deleted",
            Field::NCodeLinesInserted => "n_code_lines_inserted",
            Field::NCodeLinesDeleted => "n_code_lines_deleted",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        serde_json::from_value(serde_json::Value::String(name.to_string()))
            .map_err(|_| AppError::InvalidQuery(format!("unknown field '{}'", name)))
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Field::NLinesInserted
                | Field::NLinesDeleted
                | Field::NCodeLinesInserted
                | Field::NCodeLinesDeleted
        )
    }

    fn count(self, row: &CleanCommitFile) -> Option<u32> {
        match self {
            Field::NLinesInserted => Some(row.n_lines_inserted),
            Field::NLinesDeleted => Some(row.n_lines_deleted),
            Field::NCodeLinesInserted => Some(row.n_code_lines_inserted),
            Field::NCodeLinesDeleted => Some(row.n_code_lines_deleted),
            _ => None,
        }
    }

    /// Label of the row for this field; `None` when the cell is empty.
    pub fn label(self, row: &CleanCommitFile) -> Option<String> {
        match self {
            Field::AuthorNm => Some(row.author_nm.clone()),
            Field::ModuleNm => row.module_nm.clone(),
            Field::ComponentNm => row.component_nm.clone(),
            Field::Ext => Some(row.ext.clone()),
            Field::FilePath => Some(row.file_path.clone()),
            Field::CommitId => Some(row.commit_id.clone()),
            _ => self.count(row).map(|n| n.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freq {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl Freq {
    fn bucket(self, dt: &DateTime<Utc>) -> NaiveDate {
        let date = dt.date_naive();
        match self {
            Freq::Day => date,
            Freq::Week => date - Days::new(u64::from(date.weekday().num_days_from_monday())),
            Freq::Month => date.with_day(1).unwrap_or(date),
            Freq::Year => date.with_ordinal(1).unwrap_or(date),
        }
    }

    fn next(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Freq::Day => date.checked_add_days(Days::new(1)),
            Freq::Week => date.checked_add_days(Days::new(7)),
            Freq::Month => date.checked_add_months(Months::new(1)),
            Freq::Year => date.checked_add_months(Months::new(12)),
        }
    }

    fn label(self, date: NaiveDate) -> String {
        match self {
            Freq::Day | Freq::Week => date.format("%Y-%m-%d").to_string(),
            Freq::Month => date.format("%Y-%m").to_string(),
            Freq::Year => date.format("%Y").to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggFunc {
    #[default]
    Sum,
    Count,
    Nunique,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Rows,
    #[default]
    Columns,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Group { fields: Vec<Field> },
    Resample { freq: Freq },
    Aggregate { measure: Field, func: AggFunc },
    /// First index level becomes the rows, the remaining levels the columns.
    Pivot,
    /// Scale every column (or row) so it sums to 1.
    Normalize { axis: Axis },
    Round { decimals: u32 },
    Replace {
        from: f64,
        #[serde(default)]
        to: Option<f64>,
    },
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Operation::Group { .. } => "group",
            Operation::Resample { .. } => "resample",
            Operation::Aggregate { .. } => "aggregate",
            Operation::Pivot => "pivot",
            Operation::Normalize { .. } => "normalize",
            Operation::Round { .. } => "round",
            Operation::Replace { .. } => "replace",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub key: Vec<String>,
    pub value: Option<f64>,
}

/// Result of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatOutput {
    Series {
        index: Vec<String>,
        points: Vec<SeriesPoint>,
    },
    Matrix {
        rows: Vec<String>,
        columns: Vec<String>,
        values: Vec<Vec<Option<f64>>>,
    },
}

enum Frame<'a> {
    Rows {
        rows: &'a [CleanCommitFile],
        fields: Vec<Field>,
        freq: Option<Freq>,
    },
    Series {
        index: Vec<String>,
        points: Vec<SeriesPoint>,
    },
    Matrix {
        rows: Vec<String>,
        columns: Vec<String>,
        values: Vec<Vec<Option<f64>>>,
    },
}

impl Frame<'_> {
    fn shape(&self) -> &'static str {
        match self {
            Frame::Rows { .. } => "rows",
            Frame::Series { .. } => "series",
            Frame::Matrix { .. } => "matrix",
        }
    }
}

/// Run `operations` over the clean file rows.
pub fn run(rows: &[CleanCommitFile], operations: &[Operation]) -> Result<StatOutput> {
    let mut frame = Frame::Rows {
        rows,
        fields: Vec::new(),
        freq: None,
    };

    for operation in operations {
        frame = apply(frame, operation)?;
    }

    match frame {
        Frame::Series { index, points } => Ok(StatOutput::Series { index, points }),
        Frame::Matrix {
            rows,
            columns,
            values,
        } => Ok(StatOutput::Matrix {
            rows,
            columns,
            values,
        }),
        Frame::Rows { .. } => Err(AppError::InvalidPipeline(
            "pipeline ends before any aggregate".to_string(),
        )),
    }
}

fn apply<'a>(frame: Frame<'a>, operation: &Operation) -> Result<Frame<'a>> {
    match (frame, operation) {
        (Frame::Rows { rows, mut fields, freq }, Operation::Group { fields: extra }) => {
            if extra.is_empty() {
                return Err(AppError::InvalidPipeline("group needs at least one field".to_string()));
            }
            fields.extend(extra.iter().copied());
            Ok(Frame::Rows { rows, fields, freq })
        }
        (Frame::Rows { rows, fields, freq: None }, Operation::Resample { freq }) => Ok(Frame::Rows {
            rows,
            fields,
            freq: Some(*freq),
        }),
        (Frame::Rows { rows, fields, freq }, Operation::Aggregate { measure, func }) => {
            aggregate(rows, &fields, freq, *measure, *func)
        }
        (Frame::Series { index, points }, Operation::Pivot) => pivot(index, points),
        (Frame::Matrix { rows, columns, mut values }, Operation::Normalize { axis }) => {
            normalize(&mut values, *axis);
            Ok(Frame::Matrix { rows, columns, values })
        }
        (frame, Operation::Round { decimals }) => {
            let factor = 10f64.powi(*decimals as i32);
            map_values(frame, operation, |v| v.map(|x| (x * factor).round() / factor))
        }
        (frame, Operation::Replace { from, to }) => {
            map_values(frame, operation, |v| match v {
                Some(x) if x == *from => *to,
                other => other,
            })
        }
        (frame, operation) => Err(AppError::InvalidPipeline(format!(
            "'{}' cannot be applied to a {} frame",
            operation.name(),
            frame.shape()
        ))),
    }
}

fn map_values<'a, F>(frame: Frame<'a>, operation: &Operation, f: F) -> Result<Frame<'a>>
where
    F: Fn(Option<f64>) -> Option<f64>,
{
    match frame {
        Frame::Series { index, mut points } => {
            for point in points.iter_mut() {
                point.value = f(point.value);
            }
            Ok(Frame::Series { index, points })
        }
        Frame::Matrix { rows, columns, mut values } => {
            for cell in values.iter_mut().flatten() {
                *cell = f(*cell);
            }
            Ok(Frame::Matrix { rows, columns, values })
        }
        Frame::Rows { .. } => Err(AppError::InvalidPipeline(format!(
            "'{}' cannot be applied to a rows frame",
            operation.name()
        ))),
    }
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    count: usize,
    distinct: HashSet<String>,
}

impl Accumulator {
    fn push(&mut self, row: &CleanCommitFile, measure: Field) {
        if let Some(n) = measure.count(row) {
            self.sum += f64::from(n);
        }
        if let Some(label) = measure.label(row) {
            self.count += 1;
            self.distinct.insert(label);
        }
    }

    fn finish(&self, func: AggFunc) -> f64 {
        match func {
            AggFunc::Sum => self.sum,
            AggFunc::Count => self.count as f64,
            AggFunc::Nunique => self.distinct.len() as f64,
        }
    }
}

fn aggregate<'a>(
    rows: &[CleanCommitFile],
    fields: &[Field],
    freq: Option<Freq>,
    measure: Field,
    func: AggFunc,
) -> Result<Frame<'a>> {
    if func == AggFunc::Sum && !measure.is_numeric() {
        return Err(AppError::InvalidPipeline(format!(
            "cannot sum non-numeric field '{}'",
            measure.name()
        )));
    }

    let mut groups: BTreeMap<Vec<String>, BTreeMap<Option<NaiveDate>, Accumulator>> = BTreeMap::new();
    for row in rows {
        // rows with an empty grouping cell are left out
        let Some(key) = fields.iter().map(|f| f.label(row)).collect::<Option<Vec<_>>>() else {
            continue;
        };
        let period = freq.map(|f| f.bucket(&row.creation_dt));
        groups
            .entry(key)
            .or_default()
            .entry(period)
            .or_default()
            .push(row, measure);
    }

    let mut index: Vec<String> = fields.iter().map(|f| f.name().to_string()).collect();
    if freq.is_some() {
        index.push("creation_dt".to_string());
    }

    let mut points = Vec::new();
    for (key, periods) in groups {
        match freq {
            None => {
                for acc in periods.values() {
                    points.push(SeriesPoint {
                        key: key.clone(),
                        value: Some(acc.finish(func)),
                    });
                }
            }
            Some(freq) => {
                let first = periods.keys().next().copied().flatten();
                let last = periods.keys().next_back().copied().flatten();
                let (Some(mut current), Some(last)) = (first, last) else {
                    continue;
                };
                // empty periods inside the group's span count as zero
                loop {
                    let value = periods
                        .get(&Some(current))
                        .map(|acc| acc.finish(func))
                        .unwrap_or(0.0);
                    let mut point_key = key.clone();
                    point_key.push(freq.label(current));
                    points.push(SeriesPoint {
                        key: point_key,
                        value: Some(value),
                    });

                    match freq.next(current) {
                        Some(next) if next <= last => current = next,
                        _ => break,
                    }
                }
            }
        }
    }

    Ok(Frame::Series { index, points })
}

fn pivot<'a>(index: Vec<String>, points: Vec<SeriesPoint>) -> Result<Frame<'a>> {
    if index.len() < 2 {
        return Err(AppError::InvalidPipeline(format!(
            "pivot needs at least two index levels, got {}",
            index.len()
        )));
    }

    let split = |key: &[String]| (key[0].clone(), key[1..].join(" / "));

    let rows: Vec<String> = points
        .iter()
        .map(|p| split(&p.key).0)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let columns: Vec<String> = points
        .iter()
        .map(|p| split(&p.key).1)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut values = vec![vec![None; columns.len()]; rows.len()];
    for point in &points {
        let (row, column) = split(&point.key);
        if let (Ok(i), Ok(j)) = (rows.binary_search(&row), columns.binary_search(&column)) {
            values[i][j] = point.value;
        }
    }

    Ok(Frame::Matrix { rows, columns, values })
}

fn normalize(values: &mut [Vec<Option<f64>>], axis: Axis) {
    let n_columns = values.first().map(Vec::len).unwrap_or(0);

    let scale = |cell: &mut Option<f64>, total: f64| {
        *cell = match *cell {
            Some(x) if total != 0.0 => Some(x / total),
            _ => None,
        };
    };

    match axis {
        Axis::Rows => {
            for row in values.iter_mut() {
                let total: f64 = row.iter().flatten().sum();
                row.iter_mut().for_each(|cell| scale(cell, total));
            }
        }
        Axis::Columns => {
            for j in 0..n_columns {
                let total: f64 = values.iter().filter_map(|row| row[j]).sum();
                values.iter_mut().for_each(|row| scale(&mut row[j], total));
            }
        }
    }
}
