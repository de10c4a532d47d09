use serde_json::Value;

use super::normalize::{normalize_all, records};
use crate::error::Result;
use crate::table::Table;

/// One flat row per scheduled event.
pub(crate) fn flatten_events(doc: &Value, root: &str, id: &str) -> Result<Option<Table>> {
    let events = records(doc, root, id)?;
    let table = normalize_all(events.into_iter().map(|(_, v)| v));
    Ok((!table.is_empty()).then_some(table))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::table::Cell;

    #[test]
    fn test_events_become_rows() {
        let doc = json!({"events": [
            {"id": 1, "status": {"description": "Ended", "type": "finished"}},
            {"id": 2, "status": {"description": "Postponed"}, "roundInfo": {"round": 3}},
        ]});
        let table = flatten_events(&doc, "events", "2024-01-01").unwrap().unwrap();
        assert_eq!(
            table.columns,
            vec!["id", "status_description", "status_type", "roundInfo_round"]
        );
        assert_eq!(table.rows[1][2], Cell::Null);
        assert_eq!(table.rows[1][3], Cell::Int(3));
    }

    #[test]
    fn test_empty_day_yields_nothing() {
        let doc = json!({"events": []});
        assert!(flatten_events(&doc, "events", "2024-01-01").unwrap().is_none());
    }
}
