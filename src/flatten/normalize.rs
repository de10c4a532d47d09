use serde_json::{Map, Value};

use crate::error::{IngestError, Result};
use crate::table::{Cell, Table};

pub(crate) const SEPARATOR: &str = "_";

/// Flatten one JSON object into `(column, cell)` pairs.
///
/// Nested object keys are joined with `_`; arrays stay whole as JSON text and
/// empty objects produce no column at all.
pub(crate) fn normalize(value: &Value) -> Vec<(String, Cell)> {
    let mut out = Vec::new();
    match value {
        Value::Object(map) => flatten_into(map, None, &mut out),
        other => out.push(("0".to_string(), Cell::from_json(other))),
    }
    out
}

fn flatten_into(map: &Map<String, Value>, prefix: Option<&str>, out: &mut Vec<(String, Cell)>) {
    for (key, value) in map {
        let name = match prefix {
            Some(p) => format!("{p}{SEPARATOR}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) => flatten_into(inner, Some(&name), out),
            leaf => out.push((name, Cell::from_json(leaf))),
        }
    }
}

/// Normalize a list of JSON objects into one table.
pub(crate) fn normalize_all<'a>(values: impl IntoIterator<Item = &'a Value>) -> Table {
    Table::from_records(values.into_iter().map(normalize).collect())
}

/// Records stored under `key` of a raw document, paired with their key.
///
/// An array yields positional keys (`0`, `1`, ...), an object yields its own
/// keys. A missing or null root means there is nothing to flatten.
pub(crate) fn records<'a>(doc: &'a Value, key: &str, id: &str) -> Result<Vec<(String, &'a Value)>> {
    match doc.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect()),
        Some(Value::Object(map)) => Ok(map.iter().map(|(k, v)| (k.clone(), v)).collect()),
        Some(_) => Err(IngestError::shape(
            id,
            format!("`{key}` is neither a list nor an object"),
        )),
    }
}
