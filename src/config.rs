use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};
use crate::flatten::FlattenOptions;
use crate::model::DataKind;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:122.0) Gecko/20100101 Firefox/122.0";

/// Number of per-unit files concatenated into one intermediate during a merge.
pub const DEFAULT_MERGE_BATCH: usize = 5_000;

const MANIFEST_FILE: &str = "to_download.csv";

/// Base URLs of the three request templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Scheduled events; the date is appended.
    pub events_by_date: String,
    /// Odds; the date is appended.
    pub odds_by_date: String,
    /// Single event resources; `<id>/<kind>` is appended.
    pub single_event: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            events_by_date: "https://api.sofascore.com/api/v1/sport/football/scheduled-events/"
                .to_string(),
            odds_by_date: "https://api.sofascore.com/api/v1/sport/football/odds/1/".to_string(),
            single_event: "https://api.sofascore.com/api/v1/event/".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every template at another host, keeping the API paths.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            events_by_date: format!("{base}/api/v1/sport/football/scheduled-events/"),
            odds_by_date: format!("{base}/api/v1/sport/football/odds/1/"),
            single_event: format!("{base}/api/v1/event/"),
        }
    }

    /// URL of the date-keyed document of `kind`, if it is fetched by date.
    pub fn by_date(&self, kind: DataKind, date: &str) -> Option<String> {
        match kind {
            DataKind::Events => Some(format!("{}{date}", self.events_by_date)),
            DataKind::Odds => Some(format!("{}{date}", self.odds_by_date)),
            _ => None,
        }
    }

    /// URL of the id-keyed document of `kind`, if it is fetched by id.
    pub fn by_id(&self, kind: DataKind, id: u64) -> Option<String> {
        kind.endpoint_segment()
            .map(|segment| format!("{}{id}/{segment}", self.single_event))
    }
}

/// Request pacing and resilience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub requests_per_second: u32,
    /// Retries after the first attempt for transport errors, 429 and 5xx.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    /// Persist the manifest every this many attempted ids during a by-id pass.
    pub checkpoint_every: Option<usize>,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            requests_per_second: 4,
            max_retries: 3,
            backoff_base_ms: 500,
            checkpoint_every: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn rate(&self) -> Result<NonZeroU32> {
        NonZeroU32::new(self.requests_per_second)
            .ok_or_else(|| IngestError::Config("requests_per_second must be positive".into()))
    }

    /// Delay before retry number `attempt` (starting at 0).
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_base_ms.saturating_mul(1 << attempt.min(16)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    pub batch_size: usize,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_MERGE_BATCH,
        }
    }
}

/// All settings of the pipeline. Every field has a default, so a settings
/// file only needs to name what it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub endpoints: Endpoints,
    pub fetch: FetchSettings,
    pub flatten: FlattenOptions,
    pub merge: MergeSettings,
}

impl IngestConfig {
    /// Load settings from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read(path).map_err(|e| IngestError::io(path, e))?;
        serde_json::from_slice(&raw).map_err(|e| IngestError::Json {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Directory layout below the raw data root.
///
/// ```text
/// <root>/to_download.csv
/// <root>/<domain>/json/<key>.json
/// <root>/<domain>/csv/<key>.csv
/// <root>/<domain>/<domain>.csv
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn domain_dir(&self, kind: DataKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    pub fn json_dir(&self, kind: DataKind) -> PathBuf {
        self.domain_dir(kind).join("json")
    }

    pub fn csv_dir(&self, kind: DataKind) -> PathBuf {
        self.domain_dir(kind).join("csv")
    }

    pub fn master_csv(&self, kind: DataKind) -> PathBuf {
        self.domain_dir(kind).join(kind.master_file_name())
    }

    pub fn manifest(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"fetch": {"requests_per_second": 1}, "flatten": {"slot_encoding": "tri_state"}}"#,
        )
        .unwrap();

        let config = IngestConfig::from_path(&path).unwrap();
        assert_eq!(config.fetch.requests_per_second, 1);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.flatten.slot_encoding, crate::flatten::SlotEncoding::TriState);
        assert!(config.flatten.drop_sparse_statistics);
        assert_eq!(config.merge.batch_size, DEFAULT_MERGE_BATCH);
    }

    #[test]
    fn test_urls() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.by_id(DataKind::Lineups, 42).unwrap(),
            "https://api.sofascore.com/api/v1/event/42/lineups"
        );
        assert_eq!(
            endpoints.by_date(DataKind::Odds, "2024-02-29").unwrap(),
            "https://api.sofascore.com/api/v1/sport/football/odds/1/2024-02-29"
        );
        assert!(endpoints.by_date(DataKind::Incidents, "2024-02-29").is_none());
        assert!(endpoints.by_id(DataKind::Events, 42).is_none());
    }

    #[test]
    fn test_backoff_doubles() {
        let fetch = FetchSettings::default();
        assert_eq!(fetch.backoff(0), Duration::from_millis(500));
        assert_eq!(fetch.backoff(2), Duration::from_millis(2000));
        assert!(fetch.rate().is_ok());
    }

    #[test]
    fn test_layout() {
        let layout = DataLayout::new("/data/raw");
        assert_eq!(
            layout.master_csv(DataKind::Events),
            PathBuf::from("/data/raw/scheduled_events/scheduled_events.csv")
        );
        assert_eq!(layout.json_dir(DataKind::Odds), PathBuf::from("/data/raw/odds/json"));
        assert_eq!(layout.manifest(), PathBuf::from("/data/raw/to_download.csv"));
    }
}
