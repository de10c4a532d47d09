use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use super::{write_json, FetchFailure, FetchReport, Transport};
use crate::config::Endpoints;
use crate::error::{IngestError, Result};
use crate::model::DataKind;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Download one document per day in `[start, end]` into `dest_dir/<date>.json`.
///
/// Days whose document already exists are skipped without a request, which
/// makes repeated runs over the same range free.
#[instrument(skip(transport, endpoints), fields(%kind))]
pub(crate) async fn fetch_range(
    transport: &Transport,
    endpoints: &Endpoints,
    kind: DataKind,
    start: NaiveDate,
    end: NaiveDate,
    dest_dir: &Path,
) -> Result<FetchReport> {
    if start > end {
        return Err(IngestError::Config(format!(
            "start date {start} is after end date {end}"
        )));
    }

    let mut report = FetchReport::default();
    for date in start.iter_days().take_while(|d| *d <= end) {
        let key = date.format(DATE_FORMAT).to_string();
        let url = endpoints.by_date(kind, &key).ok_or_else(|| {
            IngestError::Config(format!("{kind} is not downloaded by date"))
        })?;
        let path = dest_dir.join(format!("{key}.json"));
        if path.exists() {
            debug!(date = %key, "already downloaded");
            report.skipped += 1;
            continue;
        }

        report.requested += 1;
        let error = match transport.get_json(&url).await {
            Ok(response) if response.status.is_success() => match response.document() {
                Some(doc) => {
                    write_json(&path, doc)?;
                    report.saved += 1;
                    info!(date = %key, status = response.status.as_u16(), "saved");
                    continue;
                }
                None => response.into_error(&url),
            },
            Ok(response) => response.into_error(&url),
            Err(e) => e,
        };
        warn!(date = %key, error = %error, "download failed");
        report.failures.push(FetchFailure { key, error });
    }

    info!(
        requested = report.requested,
        skipped = report.skipped,
        saved = report.saved,
        failed = report.failures.len(),
        "date range done"
    );
    Ok(report)
}
