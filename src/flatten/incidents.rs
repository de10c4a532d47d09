use serde::Deserialize;
use serde_json::Value;

use super::normalize::records;
use super::summary::{self, SlotEncoding};
use crate::error::{IngestError, Result};
use crate::model::Incident;
use crate::table::{Cell, Table};

/// Summarize the incidents of one match into a single row keyed by `id`.
pub(crate) fn flatten_incidents(
    doc: &Value,
    root: &str,
    id: &str,
    encoding: SlotEncoding,
) -> Result<Option<Table>> {
    let mut incidents = records(doc, root, id)?
        .into_iter()
        .map(|(_, value)| {
            Incident::deserialize(value)
                .map_err(|e| IngestError::shape(id, format!("unreadable incident: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;
    if incidents.is_empty() {
        return Ok(None);
    }

    // the API lists the newest incident first
    incidents.reverse();
    let marker = summary::has_half_time_marker(&incidents);
    let state = summary::summarize(&incidents, marker);

    let mut table = Table::new(summary::COLUMNS.iter().map(|c| c.to_string()).collect());
    table.rows.push(state.to_cells(encoding));
    table.push_column("id", Cell::from(id));
    Ok(Some(table))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_incidents_summarized_oldest_first() {
        let doc = json!({"incidents": [
            {"incidentType": "period", "text": "FT", "homeScore": 2, "awayScore": 0, "time": 90},
            {"incidentType": "goal", "incidentClass": "regular", "isHome": true,
             "homeScore": 2, "awayScore": 0, "time": 77, "player": {"name": "B"}},
            {"incidentType": "period", "text": "HT", "homeScore": 1, "awayScore": 0, "time": 45},
            {"incidentType": "goal", "incidentClass": "penalty", "isHome": true,
             "homeScore": 1, "awayScore": 0, "time": 9},
            {"incidentType": "injuryTime", "length": 2, "time": 45},
        ]});
        let table = flatten_incidents(&doc, "incidents", "11352", SlotEncoding::ZeroAsMissing)
            .unwrap()
            .unwrap();
        assert_eq!(table.columns.len(), 31);
        assert_eq!(table.columns.last().unwrap(), "id");

        let cell = |name: &str| table.rows[0][table.column_index(name).unwrap()].clone();
        assert_eq!(cell("hg_1"), Cell::Int(1));
        assert_eq!(cell("hg_2"), Cell::Int(1));
        assert_eq!(cell("hp"), Cell::Int(1));
        assert_eq!(cell("h_ht"), Cell::Int(1));
        assert_eq!(cell("h_ft"), Cell::Int(2));
        assert_eq!(cell("a_ft"), Cell::Null);
        assert_eq!(cell("id"), Cell::Text("11352".into()));
    }

    #[test]
    fn test_no_incidents_yields_nothing() {
        let doc = json!({"incidents": []});
        assert!(flatten_incidents(&doc, "incidents", "1", SlotEncoding::TriState)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_incident_without_type_is_a_shape_error() {
        let doc = json!({"incidents": [{"time": 3}]});
        let err = flatten_incidents(&doc, "incidents", "5", SlotEncoding::TriState).unwrap_err();
        assert!(matches!(err, IngestError::Shape { id, .. } if id == "5"));
    }
}
