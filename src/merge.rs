use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::error::{IngestError, Result};
use crate::table::Table;

const TEMP_DIR: &str = "temp";

/// Counts of a completed merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub files: usize,
    pub intermediates: usize,
    pub rows_read: usize,
    pub rows_written: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged(MergeReport),
    /// The destination exists and `force` was not set.
    UpToDate,
    /// No file matched the source pattern; nothing was written.
    NoInput,
}

/// Combine every CSV matching `source_glob` into `dest_dir/dest_file`.
///
/// Inputs are concatenated `batch_size` files at a time into intermediate
/// files under `dest_dir/temp`, which are then combined, stripped of exact
/// duplicate rows (the last occurrence wins) and removed.
#[instrument]
pub fn merge_all(
    source_glob: &str,
    dest_dir: &Path,
    dest_file: &str,
    force: bool,
    batch_size: usize,
) -> Result<MergeOutcome> {
    let dest = dest_dir.join(dest_file);
    if dest.exists() && !force {
        info!(dest = %dest.display(), "master table exists, not recomputing");
        return Ok(MergeOutcome::UpToDate);
    }
    if batch_size == 0 {
        return Err(IngestError::Config("merge batch size must be positive".into()));
    }

    let mut files = sorted_matches(source_glob)?;
    // the master table itself may live next to its inputs
    files.retain(|f| *f != dest);
    if files.is_empty() {
        info!(source_glob, "no input files");
        return Ok(MergeOutcome::NoInput);
    }

    let temp_dir = dest_dir.join(TEMP_DIR);
    fs::create_dir_all(&temp_dir).map_err(|e| IngestError::io(&temp_dir, e))?;
    remove_intermediates(&temp_dir)?;

    let mut report = MergeReport {
        files: files.len(),
        ..MergeReport::default()
    };
    let mut intermediates = Vec::new();
    for (n, batch) in files.chunks(batch_size).enumerate() {
        let tables = batch
            .iter()
            .map(|f| Table::read_csv(f))
            .collect::<Result<Vec<_>>>()?;
        let combined = Table::concat(tables);
        report.rows_read += combined.len();

        let temp = temp_dir.join(format!("temp_{n}.csv"));
        combined.write_csv(&temp)?;
        debug!(batch = n, files = batch.len(), rows = combined.len(), "intermediate written");
        intermediates.push(temp);
    }
    report.intermediates = intermediates.len();

    let tables = intermediates
        .iter()
        .map(|f| Table::read_csv(f))
        .collect::<Result<Vec<_>>>()?;
    let mut master = Table::concat(tables);
    master.dedup_keep_last();
    master.write_csv(&dest)?;
    report.rows_written = master.len();

    remove_intermediates(&temp_dir)?;
    if let Err(e) = fs::remove_dir(&temp_dir) {
        warn!(dir = %temp_dir.display(), error = %e, "temp directory left behind");
    }

    info!(
        files = report.files,
        rows_before = report.rows_read,
        rows_after = report.rows_written,
        dest = %dest.display(),
        "merge done"
    );
    Ok(MergeOutcome::Merged(report))
}

/// Paths matching `pattern` in sorted order. Entries that cannot be read are logged and left out.
pub(crate) fn sorted_matches(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = glob::glob(pattern)?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(pattern, error = %e, "unreadable directory entry");
                None
            }
        })
        .collect();
    files.sort();
    Ok(files)
}

fn remove_intermediates(temp_dir: &Path) -> Result<()> {
    for file in sorted_matches(&temp_dir.join("temp_*.csv").to_string_lossy())? {
        fs::remove_file(&file).map_err(|e| IngestError::io(&file, e))?;
    }
    Ok(())
}
