//! Environment-based configuration.
//!
//! Every setting comes from an environment variable (optionally loaded from
//! `.env`). Helpers that fall back to defaults never fail; `CollectorConfig::from_env`
//! fails only when a required setting is missing or malformed.

use crate::error::{CollectorError, Result};
use crate::models::TimeFrame;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_EXCHANGE: &str = "hyperliquid";
pub const DEFAULT_HYPERLIQUID_URL: &str = "https://api.hyperliquid.xyz";
pub const DEFAULT_DATA_DIR: &str = "backtesting/data";

/// Current deployment environment (`APP_ENV`), defaults to `sandbox`.
pub fn get_environment() -> String {
    env::var("APP_ENV").unwrap_or_else(|_| "sandbox".to_string())
}

pub fn get_hyperliquid_url() -> String {
    env::var("HYPERLIQUID_API_URL").unwrap_or_else(|_| DEFAULT_HYPERLIQUID_URL.to_string())
}

pub fn get_data_dir() -> PathBuf {
    env::var("COLLECTOR_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Settings for the Hyperliquid REST connector.
#[derive(Debug, Clone)]
pub struct HyperliquidConfig {
    pub base_url: String,
    /// Retries after the first attempt for transient transport errors.
    pub max_retries: usize,
    /// First backoff delay; later delays grow exponentially.
    pub retry_min_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for HyperliquidConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_HYPERLIQUID_URL.to_string(),
            max_retries: 3,
            retry_min_delay: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl HyperliquidConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: get_hyperliquid_url(),
            max_retries: env_var_parse("HYPERLIQUID_MAX_RETRIES", 3),
            retry_min_delay: Duration::from_millis(env_var_parse("HYPERLIQUID_RETRY_DELAY_MS", 500)),
            request_timeout: Duration::from_secs(env_var_parse("HYPERLIQUID_TIMEOUT_SECONDS", 30)),
        }
    }
}

/// Everything the `history-collector` binary needs for one run.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub exchange: String,
    pub symbols: Vec<String>,
    /// Empty means "use every time frame the exchange supports".
    pub time_frames: Vec<TimeFrame>,
    pub start_timestamp: Option<i64>,
    pub end_timestamp: Option<i64>,
    pub data_dir: PathBuf,
    pub hyperliquid: HyperliquidConfig,
}

impl CollectorConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let symbols = env_var_list("COLLECTOR_SYMBOLS");
        if symbols.is_empty() {
            return Err(CollectorError::Configuration(
                "COLLECTOR_SYMBOLS must list at least one symbol".to_string(),
            ));
        }

        let raw_time_frames = env_var_list("COLLECTOR_TIME_FRAMES");
        let time_frames = if raw_time_frames.iter().any(|tf| tf.eq_ignore_ascii_case("all")) {
            Vec::new()
        } else {
            raw_time_frames
                .iter()
                .map(|tf| tf.parse::<TimeFrame>())
                .collect::<Result<Vec<_>>>()?
        };

        Ok(Self {
            exchange: env::var("COLLECTOR_EXCHANGE").unwrap_or_else(|_| DEFAULT_EXCHANGE.to_string()),
            symbols,
            time_frames,
            start_timestamp: env_var_timestamp("COLLECTOR_START_MS")?,
            end_timestamp: env_var_timestamp("COLLECTOR_END_MS")?,
            data_dir: get_data_dir(),
            hyperliquid: HyperliquidConfig::from_env(),
        })
    }

    pub fn use_all_available_time_frames(&self) -> bool {
        self.time_frames.is_empty()
    }
}

fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_list(key: &str) -> Vec<String> {
    env::var(key)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Unset or blank means "no bound"; anything else must be integer milliseconds.
fn env_var_timestamp(key: &str) -> Result<Option<i64>> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|e| CollectorError::Configuration(format!("{} is not a millisecond timestamp: {}", key, e))),
        _ => Ok(None),
    }
}
