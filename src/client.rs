use std::path::Path;

use chrono::NaiveDate;
use tracing::instrument;

use crate::config::{Endpoints, FetchSettings};
use crate::error::Result;
use crate::fetch::{self, FetchReport, Transport};
use crate::model::DataKind;

/// The entry point for downloading raw documents from the Sofascore API.
///
/// `SofaClient` wraps a [`reqwest::Client`] configured with the fixed header
/// set and request timeout, and paces every request through one rate limiter.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> sofascore_ingest::Result<()> {
/// use chrono::NaiveDate;
/// use sofascore_ingest::{DataKind, SofaClient};
///
/// let client = SofaClient::new()?;
/// let day = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
/// let report = client
///     .fetch_range(DataKind::Events, day, day, "data/raw/scheduled_events/json".as_ref())
///     .await?;
/// println!("saved {} documents", report.saved);
/// # Ok(())
/// # }
/// ```
pub struct SofaClient {
    transport: Transport,
    endpoints: Endpoints,
}

impl SofaClient {
    /// Create a client with default endpoints and settings.
    pub fn new() -> Result<Self> {
        Self::with_settings(Endpoints::default(), FetchSettings::default())
    }

    pub fn with_settings(endpoints: Endpoints, settings: FetchSettings) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(settings)?,
            endpoints,
        })
    }

    /// Create a client using the provided [`reqwest::Client`].
    ///
    /// The client is used as is: headers and timeouts are up to the caller.
    pub fn with_client(
        client: reqwest::Client,
        endpoints: Endpoints,
        settings: FetchSettings,
    ) -> Result<Self> {
        Ok(Self {
            transport: Transport::with_client(client, settings)?,
            endpoints,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Download the date-keyed documents of `kind` for every day in `[start, end]`.
    #[instrument(skip(self))]
    pub async fn fetch_range(
        &self,
        kind: DataKind,
        start: NaiveDate,
        end: NaiveDate,
        dest_dir: &Path,
    ) -> Result<FetchReport> {
        fetch::by_date::fetch_range(&self.transport, &self.endpoints, kind, start, end, dest_dir)
            .await
    }

    /// Download the `kind` document of every id still pending in the manifest.
    #[instrument(skip(self))]
    pub async fn fetch_by_id(
        &self,
        kind: DataKind,
        manifest_path: &Path,
        dest_dir: &Path,
    ) -> Result<FetchReport> {
        fetch::by_id::fetch_by_id(&self.transport, &self.endpoints, kind, manifest_path, dest_dir)
            .await
    }
}
