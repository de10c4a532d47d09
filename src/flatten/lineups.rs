use itertools::Itertools;
use serde_json::Value;

use super::normalize::normalize;
use crate::error::{IngestError, Result};
use crate::table::{Cell, Table};

const RATING: &str = "statistics_rating";
const COLUMNS: [&str; 6] = ["id", "side", "position", "substitute", "player_slug", RATING];
const POSITIONS: [&str; 4] = ["G", "D", "M", "F"];
const SIDES: [(&str, &str); 2] = [("home", "H"), ("away", "A")];

/// Average player ratings per side, overall and per position.
///
/// Returns `None` when the lineup carries no player ratings at all.
pub(crate) fn flatten_lineups(doc: &Value, id: &str) -> Result<Option<Table>> {
    let mut players = Vec::new();
    for (side, _) in SIDES {
        let list = match doc.get(side).and_then(|s| s.get("players")) {
            Some(Value::Array(list)) => list,
            None | Some(Value::Null) => continue,
            Some(_) => return Err(IngestError::shape(id, format!("`{side}.players` is not a list"))),
        };
        for player in list {
            let mut row = normalize(player);
            row.push(("side".to_string(), Cell::from(side)));
            players.push(row);
        }
    }

    let mut table = Table::from_records(players);
    if table.column_index(RATING).is_none() {
        return Ok(None);
    }
    table.retain_columns(&COLUMNS);
    table.drop_incomplete_rows();

    let side_idx = table.column_index("side");
    let position_idx = table.column_index("position");
    let rating_idx = table.column_index(RATING);
    let (Some(side_idx), Some(rating_idx)) = (side_idx, rating_idx) else {
        return Ok(None);
    };

    let ratings_of = |side: &str, position: Option<&str>| {
        table
            .rows
            .iter()
            .filter(|row| row[side_idx].as_str() == Some(side))
            .filter(|row| match (position, position_idx) {
                (Some(p), Some(idx)) => row[idx].as_str() == Some(p),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter_map(|row| row[rating_idx].as_f64())
            .collect_vec()
    };

    let mut columns = vec!["id".to_string()];
    let mut row = vec![Cell::from(id)];
    for (side, tag) in SIDES {
        for position in POSITIONS {
            columns.push(format!("{position}sc_{tag}"));
            row.push(mean(&ratings_of(side, Some(position))).into());
        }
    }
    for (side, tag) in SIDES {
        columns.push(format!("sc_{tag}"));
        row.push(mean(&ratings_of(side, None)).into());
    }

    let mut out = Table::new(columns);
    out.rows.push(row);
    Ok(Some(out))
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}
