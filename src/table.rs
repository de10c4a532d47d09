use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;

use itertools::Itertools;
use serde_json::Value;

use crate::error::{IngestError, Result};

/// A single value in a flat table.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) if !v.is_nan() => Some(*v),
            Cell::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON leaf. Arrays and objects are kept as compact JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => n
                .as_i64()
                .map(Cell::Int)
                .or_else(|| n.as_f64().map(Cell::Float))
                .unwrap_or_else(|| Cell::Text(n.to_string())),
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    /// Parse a CSV field. Empty fields are missing values, everything else is kept verbatim.
    fn from_field(field: &str) -> Self {
        if field.is_empty() {
            Cell::Null
        } else {
            Cell::Text(field.to_string())
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Bool(true) => write!(f, "True"),
            Cell::Bool(false) => write!(f, "False"),
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Float(v) if v.is_nan() => Ok(()),
            Cell::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map(Cell::Float).unwrap_or(Cell::Null)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

/// A named-column table of cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from keyed records, taking the union of their keys in
    /// first-seen order. Keys a record lacks become missing values.
    pub fn from_records(records: Vec<Vec<(String, Cell)>>) -> Self {
        let mut table = Table::default();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut keyed = Vec::with_capacity(records.len());
        for record in records {
            let mut row = Vec::with_capacity(record.len());
            for (key, cell) in record {
                let next = index.len();
                let position = *index.entry(key.clone()).or_insert_with(|| {
                    table.columns.push(key);
                    next
                });
                row.push((position, cell));
            }
            keyed.push(row);
        }
        table.rows = keyed
            .into_iter()
            .map(|pairs| {
                let mut row = vec![Cell::Null; table.columns.len()];
                for (position, cell) in pairs {
                    row[position] = cell;
                }
                row
            })
            .collect();
        table
    }

    /// Stack tables vertically, aligning columns by name.
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Table {
        let mut out = Table::default();
        let mut index: HashMap<String, usize> = HashMap::new();
        for table in tables {
            let positions = table
                .columns
                .into_iter()
                .map(|name| {
                    let next = index.len();
                    *index.entry(name.clone()).or_insert_with(|| {
                        out.columns.push(name);
                        next
                    })
                })
                .collect_vec();
            for row in table.rows {
                let mut aligned = vec![Cell::Null; positions.len().max(out.columns.len())];
                for (position, cell) in positions.iter().zip(row) {
                    aligned[*position] = cell;
                }
                out.rows.push(aligned);
            }
        }
        let width = out.columns.len();
        for row in &mut out.rows {
            row.resize(width, Cell::Null);
        }
        out
    }

    /// Join tables side by side, aligning rows by position.
    pub fn hconcat(tables: impl IntoIterator<Item = Table>) -> Table {
        let mut out = Table::default();
        for table in tables {
            let height = out.rows.len().max(table.rows.len());
            let left_width = out.columns.len();
            let right_width = table.columns.len();
            out.rows.resize_with(height, || vec![Cell::Null; left_width]);
            let mut right = table.rows.into_iter();
            for row in &mut out.rows {
                let cells = right.next().unwrap_or_else(|| vec![Cell::Null; right_width]);
                row.extend(cells);
            }
            out.columns.extend(table.columns);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Keep only the listed columns that exist, in the table's own column order.
    pub fn retain_columns(&mut self, keep: &[&str]) {
        let keep_idx = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| keep.contains(&c.as_str()))
            .map(|(i, _)| i)
            .collect_vec();
        self.select_indices(&keep_idx);
    }

    /// Drop every column holding at least one missing value.
    pub fn drop_sparse_columns(&mut self) {
        let keep_idx = (0..self.columns.len())
            .filter(|&i| self.rows.iter().all(|row| !row[i].is_null()))
            .collect_vec();
        self.select_indices(&keep_idx);
    }

    /// Drop every row holding at least one missing value.
    pub fn drop_incomplete_rows(&mut self) {
        self.rows.retain(|row| row.iter().all(|c| !c.is_null()));
    }

    /// Drop exact duplicate rows, keeping the last occurrence of each.
    pub fn dedup_keep_last(&mut self) {
        let keys = self
            .rows
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect_vec())
            .collect_vec();
        let mut last: HashMap<&[String], usize> = HashMap::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            last.insert(key.as_slice(), i);
        }
        let rows = std::mem::take(&mut self.rows);
        self.rows = rows
            .into_iter()
            .enumerate()
            .filter(|(i, _)| last.get(keys[*i].as_slice()) == Some(i))
            .map(|(_, row)| row)
            .collect();
    }

    pub fn rename_columns(&mut self, f: impl Fn(&str) -> String) {
        for column in &mut self.columns {
            *column = f(column);
        }
    }

    pub fn push_column_front(&mut self, name: &str, value: Cell) {
        self.columns.insert(0, name.to_string());
        for row in &mut self.rows {
            row.insert(0, value.clone());
        }
    }

    pub fn push_column(&mut self, name: &str, value: Cell) {
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(value.clone());
        }
    }

    fn select_indices(&mut self, indices: &[usize]) {
        self.columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            let old = std::mem::take(row);
            *row = indices.iter().map(|&i| old[i].clone()).collect();
        }
    }

    /// Read a CSV file with a header row. Empty fields become missing values.
    pub fn read_csv(path: &Path) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| IngestError::csv(path, e))?;
        let columns = reader
            .headers()
            .map_err(|e| IngestError::csv(path, e))?
            .iter()
            .map(str::to_string)
            .collect_vec();
        let width = columns.len();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| IngestError::csv(path, e))?;
            let mut row = record.iter().map(Cell::from_field).collect_vec();
            row.resize(width, Cell::Null);
            rows.push(row);
        }
        Ok(Table { columns, rows })
    }

    /// Write the table as CSV with a header row, creating parent directories.
    ///
    /// The file only appears under `path` once complete, since an existing
    /// per-unit CSV marks its document as converted.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| IngestError::io(parent, e))?;
        }
        let partial = path.with_extension("csv.part");
        let mut writer =
            csv::Writer::from_path(&partial).map_err(|e| IngestError::csv(&partial, e))?;
        writer
            .write_record(&self.columns)
            .map_err(|e| IngestError::csv(&partial, e))?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(|c| c.to_string()))
                .map_err(|e| IngestError::csv(&partial, e))?;
        }
        writer.flush().map_err(|e| IngestError::io(&partial, e))?;
        drop(writer);
        fs::rename(&partial, path).map_err(|e| IngestError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_cell_rendering() {
        assert_eq!(Cell::Null.to_string(), "");
        assert_eq!(Cell::Bool(true).to_string(), "True");
        assert_eq!(Cell::Float(7.0).to_string(), "7.0");
        assert_eq!(Cell::Float(6.85).to_string(), "6.85");
        assert_eq!(Cell::Float(f64::NAN).to_string(), "");
        assert_eq!(Cell::Int(-3).to_string(), "-3");
    }

    #[test]
    fn test_concat_unions_columns() {
        let a = Table {
            columns: vec!["a".into(), "b".into()],
            rows: vec![vec![Cell::Int(1), Cell::Int(2)]],
        };
        let b = Table {
            columns: vec!["b".into(), "c".into()],
            rows: vec![vec![Cell::Int(3), Cell::Int(4)]],
        };
        let out = Table::concat([a, b]);
        assert_eq!(out.columns, vec!["a", "b", "c"]);
        assert_eq!(out.rows[0], vec![Cell::Int(1), Cell::Int(2), Cell::Null]);
        assert_eq!(out.rows[1], vec![Cell::Null, Cell::Int(3), Cell::Int(4)]);
    }

    #[test]
    fn test_hconcat_pads_shorter_side() {
        let a = Table {
            columns: vec!["a".into()],
            rows: vec![vec![Cell::Int(1)], vec![Cell::Int(2)]],
        };
        let b = Table {
            columns: vec!["b".into()],
            rows: vec![vec![Cell::Int(3)]],
        };
        let out = Table::hconcat([a, b]);
        assert_eq!(out.columns, vec!["a", "b"]);
        assert_eq!(out.rows[1], vec![Cell::Int(2), Cell::Null]);
    }

    #[test]
    fn test_dedup_keeps_last_occurrence() {
        let mut table = Table {
            columns: vec!["x".into()],
            rows: vec![vec![text("a")], vec![text("b")], vec![text("a")]],
        };
        table.dedup_keep_last();
        assert_eq!(table.rows, vec![vec![text("b")], vec![text("a")]]);
    }

    #[test]
    fn test_drop_sparse_columns() {
        let mut table = Table {
            columns: vec!["full".into(), "sparse".into()],
            rows: vec![vec![Cell::Int(1), Cell::Null], vec![Cell::Int(2), Cell::Int(5)]],
        };
        table.drop_sparse_columns();
        assert_eq!(table.columns, vec!["full"]);
        assert_eq!(table.rows, vec![vec![Cell::Int(1)], vec![Cell::Int(2)]]);
    }

    #[test]
    fn test_csv_preserves_text_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.csv");
        let table = Table {
            columns: vec!["id".into(), "rating".into(), "note".into()],
            rows: vec![vec![Cell::Int(9), Cell::Float(7.0), Cell::Null]],
        };
        table.write_csv(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "id,rating,note\n9,7.0,\n");
        assert!(!path.with_extension("csv.part").exists());

        let back = Table::read_csv(&path).unwrap();
        assert_eq!(back.rows, vec![vec![text("9"), text("7.0"), Cell::Null]]);
    }
}
