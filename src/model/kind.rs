use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// How raw documents of a kind are keyed and requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// One document per calendar day.
    ByDate,
    /// One document per event id listed in the download manifest.
    ById,
}

/// The five data kinds handled by the pipeline.
///
/// Each kind carries its own strategy: where its documents come from, which
/// directories they live in and which JSON key holds its records.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Events,
    Odds,
    Statistics,
    Incidents,
    Lineups,
}

impl DataKind {
    /// Kinds tracked per id in the download manifest, in column order.
    pub const TRACKED: [DataKind; 3] = [DataKind::Statistics, DataKind::Incidents, DataKind::Lineups];

    pub fn key_source(self) -> KeySource {
        match self {
            DataKind::Events | DataKind::Odds => KeySource::ByDate,
            DataKind::Statistics | DataKind::Incidents | DataKind::Lineups => KeySource::ById,
        }
    }

    /// Directory name of the kind below the data root.
    pub fn dir_name(self) -> &'static str {
        match self {
            DataKind::Events => "scheduled_events",
            DataKind::Odds => "odds",
            DataKind::Statistics => "statistics",
            DataKind::Incidents => "incidents",
            DataKind::Lineups => "lineups",
        }
    }

    /// File name of the combined master table.
    pub fn master_file_name(self) -> String {
        format!("{}.csv", self.dir_name())
    }

    /// Top-level key of a raw document holding the records to flatten.
    ///
    /// Lineups have no single root: they are read from `home` and `away`.
    pub fn root_key(self) -> Option<&'static str> {
        match self {
            DataKind::Events => Some("events"),
            DataKind::Odds => Some("odds"),
            DataKind::Statistics => Some("statistics"),
            DataKind::Incidents => Some("incidents"),
            DataKind::Lineups => None,
        }
    }

    /// Path segment appended to `event/<id>/` for kinds fetched by id.
    pub fn endpoint_segment(self) -> Option<&'static str> {
        match self.key_source() {
            KeySource::ById => Some(self.dir_name()),
            KeySource::ByDate => None,
        }
    }
}
