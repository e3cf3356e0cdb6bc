//! JSON-lines artifact on the local filesystem.

use super::{CandleStore, DataDescription};
use crate::error::{CollectorError, Result};
use crate::models::{Candle, TimeFrame};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, info, warn};

pub const DATA_EXTENSION: &str = "data";
pub const PART_EXTENSION: &str = "part";

/// One candle as persisted, with its owning market and closing time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCandle {
    pub exchange: String,
    pub cryptocurrency: String,
    pub symbol: String,
    pub time_frame: TimeFrame,
    pub open_time: i64,
    pub close_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactRecord {
    Description(DataDescription),
    Candle(StoredCandle),
}

/// Writes `<dir>/<name>.data.part` while collecting and renames it to
/// `<dir>/<name>.data` on finalize.
pub struct FileCandleStore {
    part_path: PathBuf,
    final_path: PathBuf,
    writer: Option<BufWriter<File>>,
    finalized: bool,
}

impl FileCandleStore {
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        let dir = dir.as_ref();
        let final_path = dir.join(format!("{}.{}", name, DATA_EXTENSION));
        let part_path = dir.join(format!("{}.{}.{}", name, DATA_EXTENSION, PART_EXTENSION));
        Self {
            part_path,
            final_path,
            writer: None,
            finalized: false,
        }
    }

    /// Store with a unique name: `<exchange>_<utc timestamp>_<short id>`.
    pub fn for_run(dir: impl AsRef<Path>, exchange: &str) -> Self {
        let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let id = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("{}_{}_{}", exchange, stamp, &id[..8]);
        Self::new(dir, &name)
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    async fn write_record(&mut self, record: &ArtifactRecord) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            CollectorError::Storage(format!("{} is not open for writing", self.part_path.display()))
        })?;
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CandleStore for FileCandleStore {
    async fn write_description(&mut self, description: &DataDescription) -> Result<()> {
        if self.writer.is_some() {
            return Err(CollectorError::Storage("Data description already written".to_string()));
        }
        if let Some(parent) = self.part_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let file = File::create(&self.part_path).await?;
        self.writer = Some(BufWriter::new(file));
        debug!(path = %self.part_path.display(), "opened candle artifact");
        self.write_record(&ArtifactRecord::Description(description.clone())).await
    }

    async fn append(
        &mut self,
        exchange: &str,
        cryptocurrency: &str,
        symbol: &str,
        time_frame: TimeFrame,
        candles: &[Candle],
        closing_timestamps: &[i64],
    ) -> Result<()> {
        if candles.len() != closing_timestamps.len() {
            return Err(CollectorError::Storage(format!(
                "{} candles but {} closing timestamps",
                candles.len(),
                closing_timestamps.len()
            )));
        }
        for (candle, close_time) in candles.iter().zip(closing_timestamps) {
            let record = ArtifactRecord::Candle(StoredCandle {
                exchange: exchange.to_string(),
                cryptocurrency: cryptocurrency.to_string(),
                symbol: symbol.to_string(),
                time_frame,
                open_time: candle.open_time,
                close_time: *close_time,
                open: candle.open,
                high: candle.high,
                low: candle.low,
                close: candle.close,
                volume: candle.volume,
            });
            self.write_record(&record).await?;
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().await?;
            writer.into_inner().sync_all().await?;
        }
        Ok(())
    }

    async fn finalize(&mut self) -> Result<PathBuf> {
        if self.writer.is_some() {
            self.stop().await?;
        }
        fs::rename(&self.part_path, &self.final_path).await?;
        self.finalized = true;
        info!(path = %self.final_path.display(), "candle artifact finalized");
        Ok(self.final_path.clone())
    }

    async fn discard(&mut self) -> Result<()> {
        self.writer = None;
        let path = self.artifact_path();
        match fs::remove_file(&path).await {
            Ok(()) => {
                warn!(path = %path.display(), "candle artifact deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn artifact_path(&self) -> PathBuf {
        if self.finalized {
            self.final_path.clone()
        } else {
            self.part_path.clone()
        }
    }
}

/// Read an artifact back: its header and every candle in write order.
pub async fn read_artifact(path: impl AsRef<Path>) -> Result<(DataDescription, Vec<StoredCandle>)> {
    let file = File::open(path.as_ref()).await?;
    let mut lines = BufReader::new(file).lines();

    let description = match lines.next_line().await? {
        Some(line) => match serde_json::from_str::<ArtifactRecord>(&line)? {
            ArtifactRecord::Description(description) => description,
            ArtifactRecord::Candle(_) => {
                return Err(CollectorError::Storage("Artifact does not start with a description".to_string()))
            }
        },
        None => return Err(CollectorError::Storage("Artifact is empty".to_string())),
    };

    let mut candles = Vec::new();
    while let Some(line) = lines.next_line().await? {
        match serde_json::from_str::<ArtifactRecord>(&line)? {
            ArtifactRecord::Candle(candle) => candles.push(candle),
            ArtifactRecord::Description(_) => {
                return Err(CollectorError::Storage("Duplicate description record".to_string()))
            }
        }
    }
    Ok((description, candles))
}
