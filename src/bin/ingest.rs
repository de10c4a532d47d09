use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sofascore_ingest::{
    BuildOutcome, DataKind, DataLayout, IngestConfig, KeySource, ManifestFilters, MergeOutcome,
    Pipeline,
};

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Download, flatten and combine Sofascore football data")]
struct Cli {
    /// Raw data root holding one directory per data kind.
    #[arg(short, long, default_value = "data/raw")]
    data_dir: PathBuf,

    /// Optional JSON settings file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download raw JSON documents.
    Download {
        kind: DataKind,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Create the download manifest from the combined events table.
    Manifest {
        /// Category slug to leave out; repeatable.
        #[arg(long = "exclude")]
        exclude_categories: Vec<String>,
        #[arg(long)]
        min_events: Option<usize>,
        /// Status description to keep; repeatable.
        #[arg(long = "status")]
        keep_statuses: Vec<String>,
    },
    /// Convert downloaded documents into per-unit CSV files.
    Convert { kind: DataKind },
    /// Combine per-unit CSV files into the master table.
    Combine {
        kind: DataKind,
        #[arg(long)]
        force: bool,
    },
    /// Download, convert and combine in one go.
    Run {
        kind: DataKind,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        force: bool,
    },
}

fn date_range(
    kind: DataKind,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> anyhow::Result<Option<(NaiveDate, NaiveDate)>> {
    match (kind.key_source(), from, to) {
        (KeySource::ById, None, None) => Ok(None),
        (KeySource::ById, _, _) => bail!("{kind} is downloaded by id; drop --from/--to"),
        (KeySource::ByDate, Some(from), to) => Ok(Some((from, to.unwrap_or(from)))),
        (KeySource::ByDate, None, _) => bail!("{kind} is downloaded by date; pass --from"),
    }
}

fn report_merge(kind: DataKind, outcome: MergeOutcome) {
    match outcome {
        MergeOutcome::Merged(report) => info!(
            %kind,
            files = report.files,
            rows = report.rows_written,
            "master table written"
        ),
        MergeOutcome::UpToDate => info!(%kind, "master table exists; pass --force to rebuild"),
        MergeOutcome::NoInput => warn!(%kind, "nothing to combine"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => IngestConfig::from_path(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => IngestConfig::default(),
    };
    let pipeline = Pipeline::new(DataLayout::new(&cli.data_dir), config)?;

    match cli.command {
        Command::Download { kind, from, to } => {
            let report = pipeline.download(kind, date_range(kind, from, to)?).await?;
            for failure in &report.failures {
                warn!(key = %failure.key, error = %failure.error, "not downloaded");
            }
        }
        Command::Manifest {
            exclude_categories,
            min_events,
            keep_statuses,
        } => {
            let filters = ManifestFilters {
                exclude_categories,
                min_events,
                keep_statuses: (!keep_statuses.is_empty()).then_some(keep_statuses),
            };
            match pipeline.build_manifest(&filters)? {
                BuildOutcome::Created { ids } => info!(ids, "manifest written"),
                BuildOutcome::AlreadyExists => info!("manifest exists already"),
            }
        }
        Command::Convert { kind } => {
            let report = pipeline.convert(kind).await?;
            for failure in &report.failures {
                warn!(path = %failure.path.display(), error = %failure.error, "not converted");
            }
        }
        Command::Combine { kind, force } => {
            report_merge(kind, pipeline.combine(kind, force).await?);
        }
        Command::Run {
            kind,
            from,
            to,
            force,
        } => {
            let report = pipeline
                .run(kind, date_range(kind, from, to)?, force)
                .await?;
            report_merge(kind, report.merge);
        }
    }
    Ok(())
}
