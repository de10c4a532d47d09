use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::client::SofaClient;
use crate::config::{DataLayout, IngestConfig};
use crate::convert::{self, ConvertReport};
use crate::error::{IngestError, Result};
use crate::fetch::FetchReport;
use crate::manifest::{self, BuildOutcome, ManifestFilters};
use crate::merge::{self, MergeOutcome};
use crate::model::{DataKind, KeySource};

/// Reports of a full download → convert → combine run of one kind.
#[derive(Debug)]
pub struct RunReport {
    pub fetch: FetchReport,
    pub convert: ConvertReport,
    pub merge: MergeOutcome,
}

/// Download, convert and combine data kinds inside one data directory.
pub struct Pipeline {
    client: SofaClient,
    layout: DataLayout,
    config: IngestConfig,
}

impl Pipeline {
    pub fn new(layout: DataLayout, config: IngestConfig) -> Result<Self> {
        let client = SofaClient::with_settings(config.endpoints.clone(), config.fetch.clone())?;
        Ok(Self::with_client(client, layout, config))
    }

    pub fn with_client(client: SofaClient, layout: DataLayout, config: IngestConfig) -> Self {
        Self {
            client,
            layout,
            config,
        }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Download the raw documents of `kind`.
    ///
    /// Date-keyed kinds need `dates`; id-keyed kinds read the manifest.
    #[instrument(skip(self))]
    pub async fn download(
        &self,
        kind: DataKind,
        dates: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<FetchReport> {
        let dest = self.layout.json_dir(kind);
        match (kind.key_source(), dates) {
            (KeySource::ByDate, Some((start, end))) => {
                self.client.fetch_range(kind, start, end, &dest).await
            }
            (KeySource::ByDate, None) => Err(IngestError::Config(format!(
                "{kind} is downloaded by date and needs a date range"
            ))),
            (KeySource::ById, _) => {
                self.client
                    .fetch_by_id(kind, &self.layout.manifest(), &dest)
                    .await
            }
        }
    }

    /// Create the manifest from the combined events table if none exists yet.
    pub fn build_manifest(&self, filters: &ManifestFilters) -> Result<BuildOutcome> {
        manifest::build_manifest(
            &self.layout.master_csv(DataKind::Events),
            filters,
            &self.layout.manifest(),
        )
    }

    /// Convert every stored document of `kind` to its per-unit CSV.
    #[instrument(skip(self))]
    pub async fn convert(&self, kind: DataKind) -> Result<ConvertReport> {
        let json_dir = self.layout.json_dir(kind);
        let csv_dir = self.layout.csv_dir(kind);
        let options = self.config.flatten;
        tokio::task::spawn_blocking(move || {
            convert::convert_dir(&json_dir, &csv_dir, kind, &options)
        })
        .await?
    }

    /// Combine the per-unit CSVs of `kind` into its master table.
    #[instrument(skip(self))]
    pub async fn combine(&self, kind: DataKind, force: bool) -> Result<MergeOutcome> {
        let pattern = self.layout.csv_dir(kind).join("*.csv");
        let pattern = pattern.to_string_lossy().into_owned();
        let dest_dir = self.layout.domain_dir(kind);
        let batch_size = self.config.merge.batch_size;
        tokio::task::spawn_blocking(move || {
            merge::merge_all(
                &pattern,
                &dest_dir,
                &kind.master_file_name(),
                force,
                batch_size,
            )
        })
        .await?
    }

    /// Download, convert and combine `kind` in sequence.
    pub async fn run(
        &self,
        kind: DataKind,
        dates: Option<(NaiveDate, NaiveDate)>,
        force: bool,
    ) -> Result<RunReport> {
        let fetch = self.download(kind, dates).await?;
        let convert = self.convert(kind).await?;
        let merge = self.combine(kind, force).await?;
        info!(
            %kind,
            saved = fetch.saved,
            fetch_failures = fetch.failures.len(),
            converted = convert.converted,
            convert_failures = convert.failures.len(),
            "run finished"
        );
        Ok(RunReport {
            fetch,
            convert,
            merge,
        })
    }
}
