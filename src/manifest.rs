//! The download manifest: which event ids still need statistics, incidents
//! and lineups fetched.
//!
//! The manifest file is the single source of truth for resuming by-id passes.
//! It is read once per pass and written back as a whole, so only one pass may
//! work on a given file at a time.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use itertools::Itertools;
use tracing::{info, instrument};

use crate::error::{IngestError, Result};
use crate::model::{DataKind, FetchOutcome, ManifestRecord, ManifestRow};

/// Event-table columns the manifest is built from.
const EVENT_COLUMNS: [&str; 5] = [
    "id",
    "tournament_slug",
    "tournament_category_slug",
    "status_description",
    "status_type",
];

/// Which events of the master events table get tracked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestFilters {
    /// Category slugs (countries) to leave out.
    pub exclude_categories: Vec<String>,
    /// Keep only (category, tournament) pairs with at least this many events.
    pub min_events: Option<usize>,
    /// Keep only events whose status description is listed.
    pub keep_statuses: Option<Vec<String>>,
}

/// Result of [`build_manifest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Created { ids: usize },
    /// A manifest already exists and was left untouched.
    AlreadyExists,
}

/// Per-kind progress counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindSummary {
    pub fetched: usize,
    pub errored: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    rows: Vec<ManifestRow>,
    index: HashMap<u64, usize>,
}

impl Manifest {
    /// A manifest with zeroed tracking state for every id.
    pub fn from_ids(ids: impl IntoIterator<Item = u64>) -> Self {
        Self::from_rows(ids.into_iter().map(ManifestRow::new).collect())
    }

    fn from_rows(rows: Vec<ManifestRow>) -> Self {
        let index = rows.iter().enumerate().map(|(i, r)| (r.id, i)).collect();
        Self { rows, index }
    }

    pub fn rows(&self) -> &[ManifestRow] {
        &self.rows
    }

    pub fn get(&self, id: u64) -> Option<&ManifestRow> {
        self.index.get(&id).map(|&i| &self.rows[i])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| IngestError::csv(path, e))?;
        let rows = reader
            .deserialize::<ManifestRecord>()
            .map(|r| r.map(ManifestRow::from).map_err(|e| IngestError::csv(path, e)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_rows(rows))
    }

    /// Overwrite `path` with the current state.
    ///
    /// The file is replaced in one rename, so an interrupted save leaves the
    /// previous state intact.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| IngestError::io(parent, e))?;
        }
        let partial = path.with_extension("csv.part");
        let mut writer = csv::Writer::from_path(&partial).map_err(|e| IngestError::csv(&partial, e))?;
        for row in &self.rows {
            writer
                .serialize(ManifestRecord::from(row))
                .map_err(|e| IngestError::csv(&partial, e))?;
        }
        writer.flush().map_err(|e| IngestError::io(&partial, e))?;
        drop(writer);
        fs::rename(&partial, path).map_err(|e| IngestError::io(path, e))
    }

    /// Ids of `kind` that have neither been fetched nor answered yet.
    pub fn pending(&self, kind: DataKind) -> Vec<u64> {
        self.rows
            .iter()
            .filter(|r| r.status(kind).is_some_and(|s| s.is_pending()))
            .map(|r| r.id)
            .collect()
    }

    /// Record the outcome of one request. Unknown ids and untracked kinds are ignored.
    pub fn record(&mut self, id: u64, kind: DataKind, outcome: FetchOutcome) {
        if let Some(status) = self
            .index
            .get(&id)
            .and_then(|&i| self.rows[i].status_mut(kind))
        {
            status.apply(outcome);
        }
    }

    pub fn summary(&self, kind: DataKind) -> KindSummary {
        self.rows
            .iter()
            .filter_map(|r| r.status(kind))
            .fold(KindSummary::default(), |mut acc, s| {
                acc.fetched += usize::from(s.fetched);
                acc.errored += usize::from(s.error);
                acc.pending += usize::from(s.is_pending());
                acc
            })
    }
}

/// One row of the event columns the manifest filters look at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EventKey {
    id: Option<u64>,
    tournament: Option<String>,
    category: Option<String>,
    status_description: Option<String>,
    status_type: Option<String>,
}

/// Select the event ids to track from the master events table and write a
/// fresh manifest, unless one already exists at `manifest_path`.
#[instrument(skip(filters))]
pub fn build_manifest(
    events_table: &Path,
    filters: &ManifestFilters,
    manifest_path: &Path,
) -> Result<BuildOutcome> {
    if manifest_path.exists() {
        info!(path = %manifest_path.display(), "manifest exists already, leaving it untouched");
        return Ok(BuildOutcome::AlreadyExists);
    }

    let events = read_event_keys(events_table)?;
    let ids = select_ids(events, filters);
    let manifest = Manifest::from_ids(ids);
    manifest.save(manifest_path)?;

    info!(ids = manifest.len(), "manifest created");
    Ok(BuildOutcome::Created {
        ids: manifest.len(),
    })
}

fn read_event_keys(path: &Path) -> Result<Vec<EventKey>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| IngestError::csv(path, e))?;
    let headers = reader
        .headers()
        .map_err(|e| IngestError::csv(path, e))?
        .clone();
    let positions = EVENT_COLUMNS
        .iter()
        .map(|column| {
            headers
                .iter()
                .position(|h| h == *column)
                .ok_or_else(|| IngestError::MissingColumn {
                    path: path.to_path_buf(),
                    column: column.to_string(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut keys = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| IngestError::csv(path, e))?;
        let field = |i: usize| {
            record
                .get(positions[i])
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        keys.push(EventKey {
            id: field(0).and_then(|v| parse_id(&v)),
            tournament: field(1),
            category: field(2),
            status_description: field(3),
            status_type: field(4),
        });
    }
    Ok(keys)
}

/// Ids may have been written as floats by earlier tooling (`123.0`).
fn parse_id(raw: &str) -> Option<u64> {
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && *v >= 0.0)
            .map(|v| v as u64)
    })
}

fn select_ids(events: Vec<EventKey>, filters: &ManifestFilters) -> BTreeSet<u64> {
    let mut events = events.into_iter().unique().collect_vec();

    if !filters.exclude_categories.is_empty() {
        events.retain(|e| {
            !matches!(&e.category, Some(c) if filters.exclude_categories.contains(c))
        });
    }

    if let Some(min_events) = filters.min_events {
        let counts = events
            .iter()
            .filter(|e| e.id.is_some())
            .filter_map(|e| Some((e.category.clone()?, e.tournament.clone()?)))
            .counts();
        let selected: HashSet<(String, String)> = counts
            .into_iter()
            .filter(|(_, n)| *n >= min_events)
            .map(|(pair, _)| pair)
            .collect();
        events.retain(|e| match (&e.category, &e.tournament) {
            (Some(c), Some(t)) => selected.contains(&(c.clone(), t.clone())),
            _ => false,
        });
    }

    if let Some(statuses) = &filters.keep_statuses {
        events.retain(|e| {
            e.status_description
                .as_ref()
                .is_some_and(|s| statuses.contains(s))
        });
    }

    events.into_iter().filter_map(|e| e.id).collect()
}
