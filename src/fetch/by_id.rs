use std::path::Path;

use tracing::{debug, info, instrument, warn};

use super::{write_json, FetchFailure, FetchReport, Transport};
use crate::config::Endpoints;
use crate::error::{IngestError, Result};
use crate::manifest::Manifest;
use crate::model::{DataKind, FetchOutcome};

/// Download the `kind` document of every pending id in the manifest.
///
/// Each attempt is recorded in the manifest, which is written back once at
/// the end of the pass (and every `checkpoint_every` ids when configured).
/// A crash loses only the attempts since the last write. On the next run an
/// id whose document is already on disk is marked fetched without a request.
#[instrument(skip(transport, endpoints), fields(%kind))]
pub(crate) async fn fetch_by_id(
    transport: &Transport,
    endpoints: &Endpoints,
    kind: DataKind,
    manifest_path: &Path,
    dest_dir: &Path,
) -> Result<FetchReport> {
    if !DataKind::TRACKED.contains(&kind) {
        return Err(IngestError::Config(format!("{kind} is not downloaded by id")));
    }

    let mut manifest = Manifest::load(manifest_path)?;
    let pending = manifest.pending(kind);
    info!(pending = pending.len(), "starting id pass");

    let checkpoint_every = transport.settings().checkpoint_every.filter(|n| *n > 0);
    let mut report = FetchReport::default();
    for (idx, id) in pending.into_iter().enumerate() {
        let path = dest_dir.join(format!("{id}.json"));
        if path.exists() {
            debug!(id, "already downloaded, marking as fetched");
            manifest.record(id, kind, FetchOutcome::AlreadyStored);
            report.skipped += 1;
            continue;
        }

        report.requested += 1;
        let outcome = match fetch_one(transport, endpoints, kind, id, &path).await {
            Ok((outcome, failure)) => {
                if let Some(error) = failure {
                    report.failures.push(FetchFailure {
                        key: id.to_string(),
                        error,
                    });
                } else {
                    report.saved += 1;
                }
                outcome
            }
            Err(e) => {
                // local write failure: keep what we have and stop
                manifest.save(manifest_path)?;
                return Err(e);
            }
        };
        manifest.record(id, kind, outcome);

        if checkpoint_every.is_some_and(|n| report.requested % n == 0) {
            manifest.save(manifest_path)?;
            debug!(idx, "manifest checkpoint");
        }
    }

    manifest.save(manifest_path)?;
    let summary = manifest.summary(kind);
    info!(
        requested = report.requested,
        saved = report.saved,
        failed = report.failures.len(),
        fetched_total = summary.fetched,
        errored_total = summary.errored,
        "id pass done"
    );
    Ok(report)
}

/// Request one id. Remote problems become an outcome plus failure; only a
/// local write error is returned as `Err`.
async fn fetch_one(
    transport: &Transport,
    endpoints: &Endpoints,
    kind: DataKind,
    id: u64,
    path: &Path,
) -> Result<(FetchOutcome, Option<IngestError>)> {
    let url = endpoints
        .by_id(kind, id)
        .ok_or_else(|| IngestError::Config(format!("{kind} is not downloaded by id")))?;

    let response = match transport.get_json(&url).await {
        Ok(response) => response,
        Err(e) => {
            warn!(id, error = %e, "no response");
            return Ok((FetchOutcome::Unreachable, Some(e)));
        }
    };

    let status = response.status.as_u16();
    match response.document() {
        Some(doc) => {
            write_json(path, doc)?;
            info!(id, status, "saved");
            Ok((FetchOutcome::Saved { status }, None))
        }
        None => {
            warn!(id, status, "rejected");
            Ok((FetchOutcome::Rejected { status }, Some(response.into_error(&url))))
        }
    }
}
