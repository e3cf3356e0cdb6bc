//! Persistence for collected candles.

pub mod file_store;

use crate::error::Result;
use crate::models::{Candle, TimeFrame};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use file_store::{read_artifact, ArtifactRecord, FileCandleStore, StoredCandle};

/// Format version written in every artifact header.
pub const DATA_FORMAT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Header record written once, before any candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataDescription {
    pub exchange: String,
    pub symbols: Vec<String>,
    pub time_frames: Vec<TimeFrame>,
    pub start_timestamp: Option<i64>,
    pub end_timestamp: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub version: String,
}

impl DataDescription {
    pub fn new(
        exchange: impl Into<String>,
        symbols: Vec<String>,
        time_frames: Vec<TimeFrame>,
        start_timestamp: Option<i64>,
        end_timestamp: Option<i64>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            symbols,
            time_frames,
            start_timestamp,
            end_timestamp,
            created_at: Utc::now(),
            version: DATA_FORMAT_VERSION.to_string(),
        }
    }
}

/// Append-only sink owned by a single collection run.
///
/// Call order is `write_description`, any number of `append`, `stop`, then
/// either `finalize` (success) or `discard` (error or stop request).
#[async_trait::async_trait]
pub trait CandleStore: Send + Sync {
    async fn write_description(&mut self, description: &DataDescription) -> Result<()>;

    async fn append(
        &mut self,
        exchange: &str,
        cryptocurrency: &str,
        symbol: &str,
        time_frame: TimeFrame,
        candles: &[Candle],
        closing_timestamps: &[i64],
    ) -> Result<()>;

    /// Flush and release the underlying writer.
    async fn stop(&mut self) -> Result<()>;

    /// Publish the artifact under its final path.
    async fn finalize(&mut self) -> Result<PathBuf>;

    /// Remove whatever was written so far.
    async fn discard(&mut self) -> Result<()>;

    /// Where the artifact currently lives.
    fn artifact_path(&self) -> PathBuf;
}
