//! Hyperliquid REST connector serving paged `candleSnapshot` history.

use super::messages::{CandleSnapshotEntry, CandleSnapshotRequest, InfoRequest};
use crate::config::HyperliquidConfig;
use crate::error::{CollectorError, Result};
use crate::models::{Candle, TimeFrame};
use crate::services::market_data::ExchangeClient;
use backon::{ExponentialBuilder, Retryable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Hyperliquid returns at most this many candles per snapshot.
pub const MAX_CANDLES_PER_REQUEST: i64 = 5_000;

const SUPPORTED_INTERVALS: [&str; 14] = [
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "8h", "12h", "1d", "3d", "1w", "1M",
];

#[derive(Debug)]
struct RequestFailure {
    message: String,
    retryable: bool,
}

pub struct HyperliquidRestClient {
    http: reqwest::Client,
    base_url: String,
    max_retries: usize,
    retry_min_delay: Duration,
    closed: AtomicBool,
}

impl HyperliquidRestClient {
    pub fn new(config: &HyperliquidConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(config.base_url.clone(), http)
            .with_max_retries(config.max_retries)
            .with_retry_min_delay(config.retry_min_delay))
    }

    /// Build around an existing HTTP client (tests point `base_url` at a mock server).
    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries: 3,
            retry_min_delay: Duration::from_millis(500),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_min_delay(mut self, delay: Duration) -> Self {
        self.retry_min_delay = delay;
        self
    }

    /// `[start, end]` open-time range to request for one page.
    ///
    /// Hyperliquid only keeps the latest `MAX_CANDLES_PER_REQUEST` candles, so a
    /// `since` older than that is moved up to the oldest retained candle. A
    /// `since` page spans everything up to `now` (at most one full snapshot) and
    /// `limit` is applied to the rows returned, so a market listed after `since`
    /// still yields its first candles.
    fn request_range(time_frame: TimeFrame, since: Option<i64>, limit: Option<usize>, now: i64) -> (i64, i64) {
        let duration = time_frame.duration_ms();
        let retention_floor = (now - MAX_CANDLES_PER_REQUEST * duration).max(0);
        match since {
            Some(start) => (start.max(retention_floor).min(now), now),
            None => {
                let count = limit
                    .map(|l| (l as i64).clamp(1, MAX_CANDLES_PER_REQUEST))
                    .unwrap_or(MAX_CANDLES_PER_REQUEST);
                ((now - count * duration).max(0), now)
            }
        }
    }

    async fn post_snapshot(&self, request: &InfoRequest) -> std::result::Result<Vec<CandleSnapshotEntry>, RequestFailure> {
        let url = format!("{}/info", self.base_url);
        let response = self.http.post(&url).json(request).send().await.map_err(|e| RequestFailure {
            retryable: e.is_connect() || e.is_timeout() || e.is_request(),
            message: format!("Request to {} failed: {}", url, e),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RequestFailure {
                retryable: status.as_u16() == 429 || status.is_server_error(),
                message: format!("Hyperliquid returned {}: {}", status, body),
            });
        }

        response.json::<Vec<CandleSnapshotEntry>>().await.map_err(|e| RequestFailure {
            retryable: false,
            message: format!("Invalid candleSnapshot payload: {}", e),
        })
    }
}

#[async_trait::async_trait]
impl ExchangeClient for HyperliquidRestClient {
    fn name(&self) -> &str {
        "hyperliquid"
    }

    async fn get_symbol_prices(
        &self,
        symbol: &str,
        time_frame: TimeFrame,
        since: Option<i64>,
        limit: Option<usize>,
    ) -> Result<Vec<Candle>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CollectorError::Transport("Hyperliquid client is closed".to_string()));
        }

        let now = chrono::Utc::now().timestamp_millis();
        let (start_time, end_time) = Self::request_range(time_frame, since, limit, now);
        let coin = self.get_pair_cryptocurrency(symbol);
        let request = InfoRequest::CandleSnapshot {
            req: CandleSnapshotRequest {
                coin: coin.clone(),
                interval: time_frame.as_str().to_string(),
                start_time,
                end_time,
            },
        };

        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.retry_min_delay)
            .with_max_times(self.max_retries);
        let entries = (|| async { self.post_snapshot(&request).await })
            .retry(backoff)
            .when(|failure: &RequestFailure| failure.retryable)
            .notify(|failure: &RequestFailure, delay: Duration| {
                warn!(coin = %coin, error = %failure.message, delay_ms = delay.as_millis() as u64, "candleSnapshot failed, retrying");
            })
            .await
            .map_err(|failure| CollectorError::Transport(failure.message))?;

        let mut candles = entries
            .into_iter()
            .map(CandleSnapshotEntry::into_candle)
            .collect::<Result<Vec<_>>>()?;
        candles.sort_by_key(|c| c.open_time);
        if let Some(limit) = limit {
            if since.is_some() {
                candles.truncate(limit);
            } else {
                let skip = candles.len().saturating_sub(limit);
                candles.drain(..skip);
            }
        }

        debug!(
            coin = %coin,
            interval = %time_frame,
            start_time,
            end_time,
            count = candles.len(),
            "fetched candleSnapshot page"
        );
        Ok(candles)
    }

    fn available_time_frames(&self) -> Vec<String> {
        SUPPORTED_INTERVALS.iter().map(|s| s.to_string()).collect()
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("Hyperliquid REST client closed");
        }
        Ok(())
    }
}
