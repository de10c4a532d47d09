use itertools::Itertools;
use serde_json::Value;

use super::normalize::{normalize, records};
use crate::error::{IngestError, Result};
use crate::table::{Cell, Table};

const COLUMNS: [&str; 8] = [
    "name",
    "home",
    "away",
    "homeValue",
    "awayValue",
    "homeTotal",
    "awayTotal",
    "period",
];

/// Explode `groups[].statisticsItems[]` of every period and pivot them into a
/// single wide row keyed by `id`.
///
/// Columns are named `<field>_<metric>_<period>`. With `drop_sparse` set, any
/// column that is missing a value after pivoting is dropped.
pub(crate) fn flatten_statistics(
    doc: &Value,
    root: &str,
    id: &str,
    drop_sparse: bool,
) -> Result<Option<Table>> {
    let mut long = Vec::new();
    for (_, record) in records(doc, root, id)? {
        let period = record.get("period").map(Cell::from_json).unwrap_or_default();
        for group in array(record, "groups", id)? {
            let group_name = group.get("groupName").map(Cell::from_json).unwrap_or_default();
            for item in array(group, "statisticsItems", id)? {
                let mut row = normalize(item);
                row.push(("groupName".to_string(), group_name.clone()));
                row.push(("period".to_string(), period.clone()));
                long.push(row);
            }
        }
    }

    let mut long = Table::from_records(long);
    if long.is_empty() {
        return Ok(None);
    }
    long.retain_columns(&COLUMNS);

    let name_idx = long
        .column_index("name")
        .ok_or_else(|| IngestError::shape(id, "statistics items without a name"))?;
    let period_idx = long
        .column_index("period")
        .ok_or_else(|| IngestError::shape(id, "statistics without a period"))?;

    let mut per_period = Vec::new();
    for period in unique_labels(&long, period_idx) {
        let rows_in_period = long
            .rows
            .iter()
            .filter(|row| row[period_idx].to_string() == period)
            .collect_vec();

        let mut per_metric = Vec::new();
        for metric in unique_labels_of(&rows_in_period, name_idx) {
            let suffix = metric_suffix(&metric);
            let value_columns = (0..long.columns.len())
                .filter(|&i| i != name_idx && i != period_idx)
                .collect_vec();
            let mut block = Table::new(
                value_columns
                    .iter()
                    .map(|&i| format!("{}_{suffix}", long.columns[i]))
                    .collect(),
            );
            block.rows = rows_in_period
                .iter()
                .filter(|row| row[name_idx].to_string() == metric)
                .map(|row| value_columns.iter().map(|&i| row[i].clone()).collect())
                .collect();
            per_metric.push(block);
        }

        let mut wide = Table::hconcat(per_metric);
        if drop_sparse {
            wide.drop_sparse_columns();
        }
        let period_suffix = period.to_lowercase();
        wide.rename_columns(|c| format!("{c}_{period_suffix}"));
        per_period.push(wide);
    }

    let mut table = Table::hconcat(per_period);
    if drop_sparse {
        table.drop_sparse_columns();
    }
    table.push_column_front("id", Cell::from(id));
    Ok(Some(table))
}

fn array<'a>(value: &'a Value, key: &str, id: &str) -> Result<&'a [Value]> {
    match value.get(key) {
        Some(Value::Array(items)) => Ok(items),
        None | Some(Value::Null) => Ok(&[]),
        Some(_) => Err(IngestError::shape(id, format!("`{key}` is not a list"))),
    }
}

fn unique_labels(table: &Table, idx: usize) -> Vec<String> {
    unique_labels_of(&table.rows.iter().collect_vec(), idx)
}

fn unique_labels_of(rows: &[&Vec<Cell>], idx: usize) -> Vec<String> {
    rows.iter().map(|row| row[idx].to_string()).unique().collect()
}

fn metric_suffix(metric: &str) -> String {
    metric.replace(' ', "_").to_lowercase()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc() -> Value {
        json!({"statistics": [
            {"period": "ALL", "groups": [
                {"groupName": "Possession", "statisticsItems": [
                    {"name": "Ball possession", "home": "55%", "away": "45%",
                     "homeValue": 55, "awayValue": 45, "compareCode": 1},
                ]},
                {"groupName": "Shots", "statisticsItems": [
                    {"name": "Total shots", "home": "12", "away": "7",
                     "homeValue": 12, "awayValue": 7},
                    {"name": "Passes", "home": "400", "away": "380",
                     "homeValue": 400, "awayValue": 380, "homeTotal": 450, "awayTotal": 440},
                ]},
            ]},
            {"period": "1ST", "groups": [
                {"groupName": "Possession", "statisticsItems": [
                    {"name": "Ball possession", "home": "60%", "away": "40%",
                     "homeValue": 60, "awayValue": 40},
                ]},
            ]},
        ]})
    }

    #[test]
    fn test_metrics_pivot_per_period() {
        let table = flatten_statistics(&doc(), "statistics", "11352", true)
            .unwrap()
            .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.columns[0], "id");
        assert_eq!(table.rows[0][0], Cell::Text("11352".into()));

        let col = |name: &str| {
            table
                .column_index(name)
                .map(|i| table.rows[0][i].clone())
        };
        assert_eq!(col("home_ball_possession_all"), Some(Cell::Text("55%".into())));
        assert_eq!(col("homeValue_total_shots_all"), Some(Cell::Int(12)));
        assert_eq!(col("awayValue_ball_possession_1st"), Some(Cell::Int(40)));
        // totals only exist for passes, so the other metrics lose those columns
        assert_eq!(col("homeTotal_passes_all"), Some(Cell::Int(450)));
        assert_eq!(col("homeTotal_ball_possession_all"), None);
        assert_eq!(col("awayTotal_total_shots_all"), None);
        assert!(table.columns.iter().all(|c| !c.contains("compareCode")));
    }

    #[test]
    fn test_sparse_columns_kept_when_configured() {
        let table = flatten_statistics(&doc(), "statistics", "11352", false)
            .unwrap()
            .unwrap();
        let idx = table.column_index("homeTotal_passes_all").unwrap();
        assert_eq!(table.rows[0][idx], Cell::Int(450));
        let idx = table.column_index("homeTotal_ball_possession_all").unwrap();
        assert_eq!(table.rows[0][idx], Cell::Null);
    }

    #[test]
    fn test_no_items_yields_nothing() {
        let doc = json!({"statistics": [{"period": "ALL", "groups": []}]});
        assert!(flatten_statistics(&doc, "statistics", "1", true)
            .unwrap()
            .is_none());
    }
}
