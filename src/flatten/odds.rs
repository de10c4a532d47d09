use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::collections::HashMap;

use itertools::Itertools;
use serde_json::Value;

use super::normalize::{normalize, records};
use crate::error::{IngestError, Result};
use crate::table::{Cell, Table};

const PIVOT_COLUMN: &str = "name";
const PIVOT_VALUE: &str = "fractionalValue";

/// Pivot the odds choices of every record into one row per record key with
/// one column per choice name.
pub(crate) fn flatten_odds(doc: &Value, root: &str, id: &str) -> Result<Option<Table>> {
    let mut pivot: HashMap<String, HashMap<String, Cell>> = HashMap::new();
    let mut names = BTreeSet::new();

    for (key, record) in records(doc, root, id)? {
        let choices = match record.get("choices") {
            Some(Value::Array(choices)) => choices,
            None | Some(Value::Null) => continue,
            Some(_) => return Err(IngestError::shape(&key, "`choices` is not a list")),
        };
        for choice in choices {
            let mut fields: HashMap<String, Cell> = normalize(choice).into_iter().collect();
            let name = match fields.remove(PIVOT_COLUMN) {
                Some(cell) if !cell.is_null() => cell.to_string(),
                _ => return Err(IngestError::shape(&key, "odds choice without a name")),
            };
            let value = fields.remove(PIVOT_VALUE).unwrap_or_default();
            let row = pivot.entry(key.clone()).or_default();
            if row.insert(name.clone(), value).is_some() {
                return Err(IngestError::DuplicatePivotKey { id: key, name });
            }
            names.insert(name);
        }
    }

    if pivot.is_empty() {
        return Ok(None);
    }

    let mut table = Table::new(
        std::iter::once("id".to_string())
            .chain(names.iter().cloned())
            .collect(),
    );
    for key in pivot.keys().sorted_by(|a, b| label_order(a, b)) {
        let row = &pivot[key];
        let mut cells = vec![label_cell(key)];
        cells.extend(names.iter().map(|n| row.get(n).cloned().unwrap_or_default()));
        table.rows.push(cells);
    }
    Ok(Some(table))
}

/// Numeric labels sort numerically and ahead of textual ones.
fn label_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn label_cell(label: &str) -> Cell {
    label
        .parse::<i64>()
        .map(Cell::Int)
        .unwrap_or_else(|_| Cell::from(label))
}
