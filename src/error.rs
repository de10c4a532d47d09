use std::path::PathBuf;

/// All errors that can occur while downloading, flattening or combining data.
#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    /// HTTP request failed (network, DNS, TLS, timeout, etc.).
    #[error("http request failed for {url}: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    /// Failed to read the response body.
    #[error("failed to read response body from {url}: {source}")]
    ResponseBody {
        url: String,
        source: reqwest::Error,
    },

    /// The response body was not valid JSON.
    #[error("response from {url} (status {status}) is not valid JSON: {source}")]
    Decode {
        url: String,
        status: u16,
        source: serde_json::Error,
    },

    /// The API answered with a non-success status or an `"error"` payload.
    #[error("api rejected {url} with status {status}")]
    Api { url: String, status: u16 },

    /// Reading or writing a file failed.
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A stored JSON document could not be read or written.
    #[error("invalid json in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A CSV file could not be read or written.
    #[error("csv error on {}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },

    #[error("invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    /// A raw document does not have the shape its data kind expects.
    #[error("unexpected document shape for {id}: {context}")]
    Shape { id: String, context: String },

    /// Pivoting found the same (id, name) pair twice.
    #[error("duplicate pivot key for {id}: choice {name:?} appears more than once")]
    DuplicatePivotKey { id: String, name: String },

    /// A table is missing a column the operation needs.
    #[error("{} has no column {column:?}", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("configuration error: {0}")]
    Config(String),

    /// A blocking conversion task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IngestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IngestError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        IngestError::Csv {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn shape(id: impl Into<String>, context: impl Into<String>) -> Self {
        IngestError::Shape {
            id: id.into(),
            context: context.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
