//! Reshaping of raw API documents into flat tables, one rule per data kind.

mod events;
mod incidents;
mod lineups;
pub(crate) mod normalize;
mod odds;
mod statistics;
pub mod summary;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::model::DataKind;
use crate::table::Table;
pub use summary::SlotEncoding;

/// Tunables of the reshaping rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenOptions {
    /// Drop statistics columns that are not observed for every period and metric.
    pub drop_sparse_statistics: bool,
    /// Encoding of zero-valued incident summary slots.
    pub slot_encoding: SlotEncoding,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            drop_sparse_statistics: true,
            slot_encoding: SlotEncoding::ZeroAsMissing,
        }
    }
}

/// Flatten one raw document of `kind` whose key (date or event id) is `id`.
///
/// `Ok(None)` means the document holds nothing to report.
pub fn flatten(
    doc: &Value,
    kind: DataKind,
    id: &str,
    options: &FlattenOptions,
) -> Result<Option<Table>> {
    let root = kind.root_key();
    let table = match (kind, root) {
        (DataKind::Events, Some(root)) => events::flatten_events(doc, root, id)?,
        (DataKind::Odds, Some(root)) => odds::flatten_odds(doc, root, id)?,
        (DataKind::Statistics, Some(root)) => {
            statistics::flatten_statistics(doc, root, id, options.drop_sparse_statistics)?
        }
        (DataKind::Incidents, Some(root)) => {
            incidents::flatten_incidents(doc, root, id, options.slot_encoding)?
        }
        (DataKind::Lineups, _) => lineups::flatten_lineups(doc, id)?,
        (kind, None) => {
            return Err(IngestError::Config(format!("{kind} has no record root")));
        }
    };
    debug!(%kind, id, rows = table.as_ref().map_or(0, Table::len), "flattened document");
    Ok(table)
}

/// Read a stored document and flatten it.
pub fn flatten_file(
    path: &Path,
    kind: DataKind,
    id: &str,
    options: &FlattenOptions,
) -> Result<Option<Table>> {
    let raw = fs::read(path).map_err(|e| IngestError::io(path, e))?;
    let doc: Value = serde_json::from_slice(&raw).map_err(|e| IngestError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    flatten(&doc, kind, id, options)
}
