//! Download, flatten and combine Sofascore football data.
//!
//! Raw JSON documents are fetched per day (events, odds) or per event id
//! (statistics, incidents, lineups), flattened into one small CSV per
//! document and combined into one deduplicated master table per data kind.

pub use client::SofaClient;
pub use config::{DataLayout, Endpoints, FetchSettings, IngestConfig, MergeSettings};
pub use convert::{convert_dir, ConvertFailure, ConvertReport};
pub use error::{IngestError, Result};
pub use fetch::{FetchFailure, FetchReport};
pub use flatten::{flatten, flatten_file, FlattenOptions, SlotEncoding};
pub use manifest::{build_manifest, BuildOutcome, KindSummary, Manifest, ManifestFilters};
pub use merge::{merge_all, MergeOutcome, MergeReport};
pub use model::*;
pub use pipeline::{Pipeline, RunReport};
pub use table::{Cell, Table};

mod client;
pub mod config;
mod convert;
mod error;
mod fetch;
pub mod flatten;
pub mod manifest;
mod merge;
mod model;
mod pipeline;
mod table;
