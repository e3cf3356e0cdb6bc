//! Perptrix History Collector
//!
//! Collects historical candles for the configured symbols and time frames,
//! writing one data file per run. Ctrl-C stops the run and discards the file.

use dotenvy::dotenv;
use perptrix_history::collector::{CollectorSettings, CollectorSupervisor, HistoryCollector, RunOutcome};
use perptrix_history::config::CollectorConfig;
use perptrix_history::db::FileCandleStore;
use perptrix_history::logging;
use perptrix_history::metrics::CollectorMetrics;
use perptrix_history::services::{ExchangeClient, HyperliquidRestClient};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging();

    let env = perptrix_history::config::get_environment();
    info!("Starting Perptrix History Collector");
    info!(environment = %env, "Environment");

    let config = CollectorConfig::from_env()?;
    if config.exchange != perptrix_history::config::DEFAULT_EXCHANGE {
        return Err(format!("Unsupported exchange: {}", config.exchange).into());
    }

    let metrics = Arc::new(CollectorMetrics::new()?);
    let exchange: Arc<dyn ExchangeClient> = Arc::new(HyperliquidRestClient::new(&config.hyperliquid)?);
    let store = FileCandleStore::for_run(&config.data_dir, &config.exchange);
    info!(path = %store.final_path().display(), "Data file");

    let settings = CollectorSettings {
        exchange: config.exchange.clone(),
        symbols: config.symbols.clone(),
        time_frames: config.time_frames.clone(),
        use_all_available_time_frames: config.use_all_available_time_frames(),
        start_timestamp: config.start_timestamp,
        end_timestamp: config.end_timestamp,
    };
    let collector = HistoryCollector::new(settings, exchange, Box::new(store))?.with_metrics(metrics.clone());

    let supervisor = CollectorSupervisor::new();
    let handle = supervisor.launch(collector).await?;

    tokio::select! {
        outcome = handle.wait() => {
            match outcome? {
                RunOutcome::Finished(path) => info!(path = %path.display(), "Historical data saved"),
                RunOutcome::Stopped => warn!("Collection stopped before completion"),
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutting down collector...");
            supervisor.stop().await;
            info!("Collector stopped");
        }
    }

    match metrics.export() {
        Ok(text) => tracing::debug!(metrics = %text, "Final metrics"),
        Err(e) => warn!(error = %e, "Failed to export metrics"),
    }
    Ok(())
}
