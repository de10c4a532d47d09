use serde::{Deserialize, Serialize};

use super::DataKind;

/// Fetch state of one data kind for one event id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindStatus {
    pub fetched: bool,
    pub status_code: u16,
    pub error: bool,
}

impl KindStatus {
    /// Ids are attempted only while nothing has been recorded for them.
    pub fn is_pending(&self) -> bool {
        !self.fetched && self.status_code == 0
    }

    pub(crate) fn apply(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Saved { status } => {
                self.fetched = status == 200;
                self.status_code = status;
                self.error = false;
            }
            FetchOutcome::Rejected { status } => {
                self.fetched = false;
                self.status_code = status;
                self.error = true;
            }
            FetchOutcome::Unreachable => {
                self.fetched = false;
                self.status_code = 0;
                self.error = true;
            }
            FetchOutcome::AlreadyStored => {
                self.fetched = true;
                self.status_code = 200;
                self.error = false;
            }
        }
    }
}

/// Result of a single by-id request, as recorded in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A JSON body without an `"error"` key was received and stored.
    Saved { status: u16 },
    /// The API answered, but with an error payload or an undecodable body.
    Rejected { status: u16 },
    /// No response at all after retries; the id stays eligible for the next pass.
    Unreachable,
    /// The document was found on disk from an earlier pass whose outcome never
    /// reached the manifest.
    AlreadyStored,
}

/// One tracked event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestRow {
    pub id: u64,
    pub statistics: KindStatus,
    pub incidents: KindStatus,
    pub lineups: KindStatus,
}

impl ManifestRow {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            statistics: KindStatus::default(),
            incidents: KindStatus::default(),
            lineups: KindStatus::default(),
        }
    }

    /// Status for `kind`, or `None` for kinds the manifest does not track.
    pub fn status(&self, kind: DataKind) -> Option<&KindStatus> {
        match kind {
            DataKind::Statistics => Some(&self.statistics),
            DataKind::Incidents => Some(&self.incidents),
            DataKind::Lineups => Some(&self.lineups),
            DataKind::Events | DataKind::Odds => None,
        }
    }

    pub fn status_mut(&mut self, kind: DataKind) -> Option<&mut KindStatus> {
        match kind {
            DataKind::Statistics => Some(&mut self.statistics),
            DataKind::Incidents => Some(&mut self.incidents),
            DataKind::Lineups => Some(&mut self.lineups),
            DataKind::Events | DataKind::Odds => None,
        }
    }
}

/// On-disk layout of a manifest row (`to_download.csv`).
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ManifestRecord {
    pub id: u64,
    pub statistics: u8,
    pub statistics_status_code: u16,
    pub statistics_error: u8,
    pub incidents: u8,
    pub incidents_status_code: u16,
    pub incidents_error: u8,
    pub lineups: u8,
    pub lineups_status_code: u16,
    pub lineups_error: u8,
}

fn flag(value: u8) -> bool {
    value != 0
}

impl From<ManifestRecord> for ManifestRow {
    fn from(r: ManifestRecord) -> Self {
        let status = |fetched, status_code, error| KindStatus {
            fetched: flag(fetched),
            status_code,
            error: flag(error),
        };
        ManifestRow {
            id: r.id,
            statistics: status(r.statistics, r.statistics_status_code, r.statistics_error),
            incidents: status(r.incidents, r.incidents_status_code, r.incidents_error),
            lineups: status(r.lineups, r.lineups_status_code, r.lineups_error),
        }
    }
}

impl From<&ManifestRow> for ManifestRecord {
    fn from(row: &ManifestRow) -> Self {
        ManifestRecord {
            id: row.id,
            statistics: row.statistics.fetched.into(),
            statistics_status_code: row.statistics.status_code,
            statistics_error: row.statistics.error.into(),
            incidents: row.incidents.fetched.into(),
            incidents_status_code: row.incidents.status_code,
            incidents_error: row.incidents.error.into(),
            lineups: row.lineups.fetched.into(),
            lineups_status_code: row.lineups.status_code,
            lineups_error: row.lineups.error.into(),
        }
    }
}
