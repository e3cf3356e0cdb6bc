//! Wire types for the Hyperliquid `/info` endpoint.

use crate::error::{CollectorError, Result};
use crate::models::Candle;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InfoRequest {
    CandleSnapshot { req: CandleSnapshotRequest },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleSnapshotRequest {
    pub coin: String,
    pub interval: String,
    pub start_time: i64,
    pub end_time: i64,
}

/// One row of a `candleSnapshot` response. Prices arrive as decimal strings.
#[derive(Debug, Clone, Deserialize)]
pub struct CandleSnapshotEntry {
    #[serde(rename = "t")]
    pub open_time: i64,
    #[serde(rename = "T")]
    pub close_time: i64,
    #[serde(rename = "s")]
    pub coin: String,
    #[serde(rename = "i")]
    pub interval: String,
    #[serde(rename = "o")]
    pub open: String,
    #[serde(rename = "h")]
    pub high: String,
    #[serde(rename = "l")]
    pub low: String,
    #[serde(rename = "c")]
    pub close: String,
    #[serde(rename = "v")]
    pub volume: String,
    #[serde(rename = "n")]
    pub trades: u64,
}

impl CandleSnapshotEntry {
    pub fn into_candle(self) -> Result<Candle> {
        Ok(Candle::new(
            self.open_time,
            parse_decimal("open", &self.open)?,
            parse_decimal("high", &self.high)?,
            parse_decimal("low", &self.low)?,
            parse_decimal("close", &self.close)?,
            parse_decimal("volume", &self.volume)?,
        ))
    }
}

fn parse_decimal(field: &str, raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|e| CollectorError::Transport(format!("Invalid {} value '{}': {}", field, raw, e)))
}
