// In-memory metric table and CSV loading/writing.
//
// Rows are entities (matches, actions or players); columns are named metrics
// or identity fields. Cells are numbers, text, or missing.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::Path;

use tracing::warn;

use crate::error::{ScoreError, ScoreResult};

// ---------------------------------------------------------------------------
// Cell values
// ---------------------------------------------------------------------------

/// Cell contents that load as missing (after trimming), matching the usual
/// spreadsheet export conventions.
const MISSING_MARKERS: &[&str] = &["NA", "N/A", "#N/A", "NaN", "nan", "null", "NULL", "None"];

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    /// Parse a raw CSV cell.
    pub fn parse(raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() || MISSING_MARKERS.contains(&trimmed) {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) => Value::Number(v),
            Err(_) => Value::Text(trimmed.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Render the cell as a label (league names, player names). Numbers are
    /// formatted, missing cells have no label.
    pub fn label(&self) -> Option<String> {
        match self {
            Value::Number(v) => Some(v.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Missing => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Value::Number(v) if v.is_nan() => "NaN".to_string(),
            Value::Number(v) => v.to_string(),
            Value::Text(s) => s.clone(),
            Value::Missing => String::new(),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Value::Missing, Value::Number)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// Read a cell as a number. Text where a number is required is a type error.
fn cell_number(value: &Value, column: &str, row: usize) -> ScoreResult<Option<f64>> {
    match value {
        Value::Number(v) => Ok(Some(*v)),
        Value::Missing => Ok(None),
        Value::Text(s) => Err(ScoreError::TypeInput {
            column: column.to_string(),
            row,
            message: format!("expected a number, found text `{s}`"),
        }),
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to access file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("table shape error: {0}")]
    Shape(String),
}

// ---------------------------------------------------------------------------
// MetricTable
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl MetricTable {
    /// Create an empty table with the given columns. Duplicate names are rejected.
    pub fn new<I, S>(columns: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(TableError::Shape(format!("duplicate column `{name}`")));
            }
        }
        Ok(MetricTable {
            columns,
            rows: Vec::new(),
        })
    }

    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Value>>) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = MetricTable::new(columns)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::Shape(format!(
                "row {} has {} cells, expected {}",
                self.rows.len(),
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Fail with `MissingColumn` naming every requested column that is absent.
    pub fn require_columns<'a, I>(&self, names: I) -> ScoreResult<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let missing: Vec<&str> = names.into_iter().filter(|n| !self.has_column(n)).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ScoreError::missing_columns(missing))
        }
    }

    fn require_index(&self, name: &str) -> ScoreResult<usize> {
        self.column_index(name)
            .ok_or_else(|| ScoreError::missing_columns([name]))
    }

    /// Cloned cells of one column, in row order.
    pub fn values(&self, name: &str) -> ScoreResult<Vec<Value>> {
        let idx = self.require_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx].clone()).collect())
    }

    /// Numeric view of one column; missing cells are `None`.
    pub fn numeric_column(&self, name: &str) -> ScoreResult<Vec<Option<f64>>> {
        let idx = self.require_index(name)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(row, cells)| cell_number(&cells[idx], name, row))
            .collect()
    }

    /// Whether a column holds at least one number and no text.
    pub fn is_numeric_column(&self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        let mut any_number = false;
        for cells in &self.rows {
            match &cells[idx] {
                Value::Number(_) => any_number = true,
                Value::Text(_) => return false,
                Value::Missing => {}
            }
        }
        any_number
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        (index < self.rows.len()).then_some(Row { table: self, index })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.rows.len()).map(move |index| Row { table: self, index })
    }

    /// Replace a column in place, or append it after every existing column.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::Shape(format!(
                "column `{name}` has {} values, table has {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Overwrite an existing column with values derived from it, row for row.
    pub(crate) fn replace_numeric(&mut self, name: &str, values: Vec<Option<f64>>) -> ScoreResult<()> {
        let idx = self.require_index(name)?;
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = Value::from(value);
        }
        Ok(())
    }

    /// Copy of the table with a numeric column appended (or replaced).
    pub fn with_numeric_column(&self, name: &str, values: &[f64]) -> Result<Self, TableError> {
        let mut out = self.clone();
        out.set_column(name, values.iter().copied().map(Value::Number).collect())?;
        Ok(out)
    }

    /// New table with exactly `names`, in that order.
    pub fn select(&self, names: &[String]) -> ScoreResult<Self> {
        self.require_columns(names.iter().map(String::as_str))?;
        let indices: Vec<usize> = names
            .iter()
            .filter_map(|n| self.column_index(n))
            .collect();
        Ok(MetricTable {
            columns: names.to_vec(),
            rows: self
                .rows
                .iter()
                .map(|r| indices.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        })
    }

    // -----------------------------------------------------------------------
    // CSV I/O
    // -----------------------------------------------------------------------

    /// Load a table from CSV. Malformed records are skipped with a warning.
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self, TableError> {
        load_from_reader(rdr).map_err(|e| match e {
            LoadError::Csv(source) => TableError::Csv {
                path: "<reader>".into(),
                source,
            },
            LoadError::Table(e) => e,
        })
    }

    pub fn read_csv(path: &Path) -> Result<Self, TableError> {
        let file = std::fs::File::open(path).map_err(|e| TableError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        load_from_reader(file).map_err(|e| match e {
            LoadError::Csv(source) => TableError::Csv {
                path: path.display().to_string(),
                source,
            },
            LoadError::Table(e) => e,
        })
    }

    pub fn to_writer<W: Write>(&self, wtr: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(wtr);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(Value::render))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), TableError> {
        let file = std::fs::File::create(path).map_err(|e| TableError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        self.to_writer(file).map_err(|e| TableError::Csv {
            path: path.display().to_string(),
            source: e,
        })
    }
}

enum LoadError {
    Csv(csv::Error),
    Table(TableError),
}

fn load_from_reader<R: Read>(rdr: R) -> Result<MetricTable, LoadError> {
    let mut reader = csv::Reader::from_reader(rdr);
    let headers: Vec<String> = reader
        .headers()
        .map_err(LoadError::Csv)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut table = MetricTable::new(headers).map_err(LoadError::Table)?;
    for (line, result) in reader.records().enumerate() {
        match result {
            Ok(record) => {
                let row: Vec<Value> = record.iter().map(Value::parse).collect();
                if let Err(e) = table.push_row(row) {
                    warn!("skipping record {}: {}", line + 1, e);
                }
            }
            Err(e) => {
                warn!("skipping malformed record {}: {}", line + 1, e);
            }
        }
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Row view
// ---------------------------------------------------------------------------

/// Borrowed view of a single row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a MetricTable,
    index: usize,
}

impl<'a> Row<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, column: &str) -> Option<&'a Value> {
        let idx = self.table.column_index(column)?;
        Some(&self.table.rows[self.index][idx])
    }

    /// Numeric cell; `None` when missing.
    pub fn number(&self, column: &str) -> ScoreResult<Option<f64>> {
        let value = self
            .get(column)
            .ok_or_else(|| ScoreError::missing_columns([column]))?;
        cell_number(value, column, self.index)
    }

    /// Numeric cell where a scalar is required; missing reads as NaN.
    pub fn number_or_nan(&self, column: &str) -> ScoreResult<f64> {
        Ok(self.number(column)?.unwrap_or(f64::NAN))
    }

    pub fn label(&self, column: &str) -> Option<String> {
        self.get(column).and_then(Value::label)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
