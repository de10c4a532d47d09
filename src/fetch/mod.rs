pub(crate) mod by_date;
pub(crate) mod by_id;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::FetchSettings;
use crate::error::{IngestError, Result};

/// A single request that did not produce a stored document.
#[derive(Debug)]
pub struct FetchFailure {
    /// Date or event id of the request.
    pub key: String,
    pub error: IngestError,
}

/// Outcome counts of a fetch pass.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Requests sent (retries not counted).
    pub requested: usize,
    /// Keys whose document already existed on disk.
    pub skipped: usize,
    pub saved: usize,
    pub failures: Vec<FetchFailure>,
}

/// Status and decoded body of an API response.
#[derive(Debug)]
pub(crate) struct ApiResponse {
    pub status: StatusCode,
    pub body: std::result::Result<Value, serde_json::Error>,
}

impl ApiResponse {
    /// The body, if it decoded and does not carry an `"error"` payload.
    pub fn document(&self) -> Option<&Value> {
        self.body.as_ref().ok().filter(|v| v.get("error").is_none())
    }

    /// Describe why this response is not a usable document.
    pub fn into_error(self, url: &str) -> IngestError {
        match self.body {
            Err(source) => IngestError::Decode {
                url: url.to_owned(),
                status: self.status.as_u16(),
                source,
            },
            Ok(_) => IngestError::Api {
                url: url.to_owned(),
                status: self.status.as_u16(),
            },
        }
    }
}

/// Paced HTTP access to the API: fixed headers, request timeout, a rate
/// limiter shared by every request and exponential backoff on transient
/// failures.
pub(crate) struct Transport {
    http: reqwest::Client,
    limiter: DefaultDirectRateLimiter,
    settings: FetchSettings,
}

impl Transport {
    pub fn new(settings: FetchSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout())
            .build()
            .map_err(|e| IngestError::Config(format!("cannot build http client: {e}")))?;
        Self::with_client(http, settings)
    }

    pub fn with_client(http: reqwest::Client, settings: FetchSettings) -> Result<Self> {
        let limiter = RateLimiter::direct(Quota::per_second(settings.rate()?));
        Ok(Self {
            http,
            limiter,
            settings,
        })
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// GET `url` and decode the body as JSON.
    ///
    /// Transport errors, 429 and 5xx are retried; any other status is handed
    /// back to the caller together with whatever body came with it.
    pub async fn get_json(&self, url: &str) -> Result<ApiResponse> {
        let mut attempt = 0;
        loop {
            self.limiter.until_ready().await;
            debug!(url, attempt, "requesting document");

            let retry_reason = match self.send(url).await {
                Ok(response) if is_transient(response.status) => {
                    if attempt >= self.settings.max_retries {
                        return Ok(response);
                    }
                    format!("status {}", response.status)
                }
                Ok(response) => return Ok(response),
                Err(e) => {
                    if attempt >= self.settings.max_retries {
                        return Err(e);
                    }
                    e.to_string()
                }
            };

            let delay = self.settings.backoff(attempt);
            warn!(url, attempt, reason = %retry_reason, delay_ms = delay.as_millis() as u64, "retrying request");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn send(&self, url: &str) -> Result<ApiResponse> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| IngestError::Http {
                url: url.to_owned(),
                source: e,
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| IngestError::ResponseBody {
                url: url.to_owned(),
                source: e,
            })?;

        Ok(ApiResponse {
            status,
            body: serde_json::from_slice(&bytes),
        })
    }
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Store a document, creating the directory if needed.
///
/// The file appears under its final name only once fully written, since its
/// existence alone marks the key as fetched.
pub(crate) fn write_json(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| IngestError::io(parent, e))?;
    }
    let partial = path.with_extension("json.part");
    let file = File::create(&partial).map_err(|e| IngestError::io(&partial, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value).map_err(|e| IngestError::Json {
        path: partial.clone(),
        source: e,
    })?;
    writer.flush().map_err(|e| IngestError::io(&partial, e))?;
    fs::rename(&partial, path).map_err(|e| IngestError::io(path, e))
}
