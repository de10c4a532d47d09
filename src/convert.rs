use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, instrument, warn};

use crate::error::{IngestError, Result};
use crate::flatten::{self, FlattenOptions};
use crate::merge;
use crate::model::DataKind;

/// A document that could not be converted.
#[derive(Debug)]
pub struct ConvertFailure {
    pub path: PathBuf,
    pub error: IngestError,
}

/// Outcome counts of a conversion pass.
#[derive(Debug, Default)]
pub struct ConvertReport {
    pub converted: usize,
    /// Documents whose CSV already existed.
    pub skipped: usize,
    /// Documents with nothing to report.
    pub empty: usize,
    pub failures: Vec<ConvertFailure>,
}

enum FileOutcome {
    Converted,
    Skipped,
    Empty,
}

/// Convert every `*.json` document in `json_dir` into `csv_dir/<stem>.csv`.
///
/// Files are processed in parallel and independently: a bad document is
/// reported in the returned failures and does not stop the others. The call
/// returns only once every file has been handled.
#[instrument(skip(options))]
pub fn convert_dir(
    json_dir: &Path,
    csv_dir: &Path,
    kind: DataKind,
    options: &FlattenOptions,
) -> Result<ConvertReport> {
    let files = list_documents(json_dir)?;
    info!(files = files.len(), "converting documents");
    fs::create_dir_all(csv_dir).map_err(|e| IngestError::io(csv_dir, e))?;

    let outcomes: Vec<(PathBuf, Result<FileOutcome>)> = files
        .into_par_iter()
        .map(|path| {
            let outcome = convert_file(&path, csv_dir, kind, options);
            (path, outcome)
        })
        .collect();

    let mut report = ConvertReport::default();
    for (path, outcome) in outcomes {
        match outcome {
            Ok(FileOutcome::Converted) => report.converted += 1,
            Ok(FileOutcome::Skipped) => report.skipped += 1,
            Ok(FileOutcome::Empty) => report.empty += 1,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "conversion failed");
                report.failures.push(ConvertFailure { path, error });
            }
        }
    }

    info!(
        converted = report.converted,
        skipped = report.skipped,
        empty = report.empty,
        failed = report.failures.len(),
        "conversion done"
    );
    Ok(report)
}

fn list_documents(json_dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = json_dir.join("*.json");
    merge::sorted_matches(&pattern.to_string_lossy())
}

/// The per-unit key of a stored document is its file stem.
fn document_key(path: &Path) -> Result<&str> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| IngestError::shape(path.display().to_string(), "file name is not a valid key"))
}

fn convert_file(
    path: &Path,
    csv_dir: &Path,
    kind: DataKind,
    options: &FlattenOptions,
) -> Result<FileOutcome> {
    let key = document_key(path)?;
    let target = csv_dir.join(format!("{key}.csv"));
    if target.exists() {
        return Ok(FileOutcome::Skipped);
    }
    match flatten::flatten_file(path, kind, key, options)? {
        Some(table) => {
            table.write_csv(&target)?;
            Ok(FileOutcome::Converted)
        }
        None => Ok(FileOutcome::Empty),
    }
}
