//! Historical candle collection over `symbols × time frames`.

use super::job::CollectionJob;
use super::progress::{compute_percent, RunProgress, RunState};
use super::window::{self, now_ms, TimeWindow};
use crate::db::{CandleStore, DataDescription};
use crate::error::{CollectorError, Result};
use crate::metrics::CollectorMetrics;
use crate::models::{find_min_time_frame, Candle, TimeFrame};
use crate::services::ExchangeClient;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What a run asks for, before anything is fetched.
#[derive(Debug, Clone, Default)]
pub struct CollectorSettings {
    pub exchange: String,
    pub symbols: Vec<String>,
    pub time_frames: Vec<TimeFrame>,
    /// Ignore `time_frames` and use everything the exchange supports.
    pub use_all_available_time_frames: bool,
    pub start_timestamp: Option<i64>,
    pub end_timestamp: Option<i64>,
}

impl CollectorSettings {
    pub fn validate(&self) -> Result<()> {
        if self.exchange.trim().is_empty() {
            return Err(CollectorError::Configuration("Please select an exchange.".to_string()));
        }
        if self.symbols.iter().all(|s| s.trim().is_empty()) {
            return Err(CollectorError::Configuration("Please select a trading pair.".to_string()));
        }
        if self.time_frames.is_empty() && !self.use_all_available_time_frames {
            return Err(CollectorError::Configuration("Please select a time frame.".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every job completed; the artifact was published at this path.
    Finished(PathBuf),
    /// A stop was requested; nothing was kept.
    Stopped,
}

pub struct HistoryCollector {
    exchange_name: String,
    symbols: Vec<String>,
    time_frames: Vec<TimeFrame>,
    use_all_available_time_frames: bool,
    window: TimeWindow,
    exchange: Arc<dyn ExchangeClient>,
    store: Box<dyn CandleStore>,
    progress: Arc<RunProgress>,
    metrics: Option<Arc<CollectorMetrics>>,
    page_limit: Option<usize>,
}

impl HistoryCollector {
    pub fn new(
        settings: CollectorSettings,
        exchange: Arc<dyn ExchangeClient>,
        store: Box<dyn CandleStore>,
    ) -> Result<Self> {
        settings.validate()?;
        let window = TimeWindow::new(settings.start_timestamp, settings.end_timestamp)?;
        let symbols = settings
            .symbols
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(Self {
            exchange_name: settings.exchange,
            symbols,
            time_frames: settings.time_frames,
            use_all_available_time_frames: settings.use_all_available_time_frames,
            window,
            exchange,
            store,
            progress: Arc::new(RunProgress::new()),
            metrics: None,
            page_limit: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<CollectorMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Cap every page request at `limit` candles instead of the exchange default.
    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = Some(limit.max(1));
        self
    }

    pub fn progress(&self) -> Arc<RunProgress> {
        self.progress.clone()
    }

    pub fn exchange_name(&self) -> &str {
        &self.exchange_name
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn time_frames(&self) -> &[TimeFrame] {
        &self.time_frames
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Run every job once. Each collector runs at most once.
    pub async fn start(&mut self) -> Result<RunOutcome> {
        if !self.progress.begin() {
            return Err(CollectorError::Configuration(
                "This collector has already been started".to_string(),
            ));
        }
        info!(
            exchange = %self.exchange_name,
            symbols = %self.symbols.join(", "),
            "Starting historical data collection"
        );

        let result = self.collect().await;
        self.finish(result).await
    }

    async fn collect(&mut self) -> Result<()> {
        if self.use_all_available_time_frames {
            self.load_all_available_time_frames();
        }
        if self.time_frames.is_empty() {
            return Err(CollectorError::Configuration(format!(
                "No supported time frame available on {}",
                self.exchange_name
            )));
        }

        self.check_timestamps().await?;

        let description = DataDescription::new(
            self.exchange_name.clone(),
            self.symbols.clone(),
            self.time_frames.clone(),
            self.window.start(),
            self.window.end(),
        );
        self.store.write_description(&description).await?;

        let jobs = self.build_jobs();
        self.progress.set_total_steps(jobs.len());
        let per_symbol = self.time_frames.len();

        for (symbol_index, symbol_jobs) in jobs.chunks(per_symbol).enumerate() {
            let symbol = &symbol_jobs[0].symbol;
            self.collect_ticker(symbol).await?;
            self.collect_order_book(symbol).await?;
            self.collect_recent_trades(symbol).await?;

            for (tf_index, job) in symbol_jobs.iter().enumerate() {
                if self.progress.should_stop() {
                    info!(symbol = %job.symbol, "Stop requested, leaving collection loop");
                    return Ok(());
                }
                self.progress.start_step(symbol_index * per_symbol + tf_index + 1);
                self.collect_time_frame(job).await?;
                self.collect_kline(job).await?;
            }
        }
        Ok(())
    }

    fn load_all_available_time_frames(&mut self) {
        let advertised = self.exchange.available_time_frames();
        self.time_frames = TimeFrame::intersect_supported(&advertised);
        debug!(
            exchange = %self.exchange_name,
            count = self.time_frames.len(),
            "Loaded available time frames"
        );
    }

    fn build_jobs(&self) -> Vec<CollectionJob> {
        self.symbols
            .iter()
            .flat_map(|symbol| {
                self.time_frames.iter().map(move |tf| {
                    CollectionJob::new(
                        self.exchange_name.clone(),
                        symbol.clone(),
                        *tf,
                        self.window.start(),
                        self.window.end(),
                    )
                })
            })
            .collect()
    }

    /// Raise the requested start to the earliest candle any symbol has, then
    /// reject windows that start after their end.
    pub async fn check_timestamps(&mut self) -> Result<()> {
        if self.window.start().is_some() {
            let min_time_frame = find_min_time_frame(&self.time_frames).ok_or_else(|| {
                CollectorError::Configuration("No time frame to check timestamps against".to_string())
            })?;

            let mut floor: Option<i64> = None;
            for symbol in &self.symbols {
                match self.get_first_candle_timestamp(symbol, min_time_frame).await? {
                    Some(first) => floor = Some(floor.map_or(first, |f| f.min(first))),
                    None => debug!(symbol = %symbol, "No candle available, ignored for start floor"),
                }
            }

            if let Some(floor) = floor {
                if self.window.raise_start(floor) {
                    info!(
                        exchange = %self.exchange_name,
                        start = floor,
                        "Requested start is before the first available candle, using {}",
                        floor
                    );
                }
            }
        }
        self.window.validate(now_ms())
    }

    /// Opening time of the oldest candle the exchange has, if any.
    pub async fn get_first_candle_timestamp(&self, symbol: &str, time_frame: TimeFrame) -> Result<Option<i64>> {
        let candles = self
            .exchange
            .get_symbol_prices(symbol, time_frame, Some(0), Some(1))
            .await?;
        Ok(candles.first().map(|c| c.open_time))
    }

    async fn collect_time_frame(&mut self, job: &CollectionJob) -> Result<()> {
        let Some(requested_start) = job.start else {
            return self.collect_latest(job).await;
        };

        let duration = job.duration_ms();
        let start = match self.get_first_candle_timestamp(&job.symbol, job.time_frame).await? {
            Some(first) => requested_start.max(first),
            None => requested_start,
        };
        let end = job.end.unwrap_or_else(now_ms);
        if !window::has_room_for_candle(start, end, duration) {
            debug!(symbol = %job.symbol, time_frame = %job.time_frame, "Window shorter than one candle, nothing to fetch");
            self.report_progress(job, 100);
            return Ok(());
        }

        let mut since = start;
        let mut first_open_time: Option<i64> = None;
        let mut previous_last: Option<i64> = None;

        loop {
            if self.progress.should_stop() {
                return Ok(());
            }

            let mut page = self.fetch_page(job, Some(since)).await?;
            let Some(last_fetched) = page.iter().map(|c| c.open_time).max() else {
                break;
            };
            if previous_last.is_some_and(|previous| last_fetched <= previous) {
                warn!(
                    symbol = %job.symbol,
                    time_frame = %job.time_frame,
                    since,
                    "Exchange returned no newer candle, ending job"
                );
                break;
            }
            previous_last = Some(last_fetched);

            if job.end.is_some() {
                window::trim_to_end(&mut page, end);
            }
            self.exchange.uniformize_candles(&mut page);

            let first = match (first_open_time, page.first()) {
                (Some(first), _) => first,
                (None, Some(candle)) => *first_open_time.insert(candle.open_time),
                (None, None) => since,
            };
            self.persist(job, &mut page).await?;
            self.report_progress(job, compute_percent(first, last_fetched, end));

            since = last_fetched + duration;
            let horizon = job.end.unwrap_or_else(now_ms);
            if since > horizon {
                break;
            }
        }

        self.progress.set_percent(100);
        Ok(())
    }

    /// No start requested: a single default page, no pagination.
    async fn collect_latest(&mut self, job: &CollectionJob) -> Result<()> {
        let mut page = self.fetch_page(job, None).await?;
        if let Some(end) = job.end {
            window::trim_to_end(&mut page, end);
        }
        self.exchange.uniformize_candles(&mut page);
        self.persist(job, &mut page).await?;
        self.report_progress(job, 100);
        Ok(())
    }

    async fn fetch_page(&self, job: &CollectionJob, since: Option<i64>) -> Result<Vec<Candle>> {
        let page = self
            .exchange
            .get_symbol_prices(&job.symbol, job.time_frame, since, self.page_limit)
            .await?;
        if let Some(metrics) = &self.metrics {
            metrics.pages_fetched_total.inc();
        }
        Ok(page)
    }

    /// Append the page with its closing timestamps, then empty it.
    async fn persist(&mut self, job: &CollectionJob, candles: &mut Vec<Candle>) -> Result<()> {
        if candles.is_empty() {
            return Ok(());
        }
        let duration = job.duration_ms();
        let closing_timestamps: Vec<i64> = candles.iter().map(|c| c.close_time(duration)).collect();
        let cryptocurrency = self.exchange.get_pair_cryptocurrency(&job.symbol);
        self.store
            .append(
                &job.exchange,
                &cryptocurrency,
                &job.symbol,
                job.time_frame,
                candles,
                &closing_timestamps,
            )
            .await?;
        if let Some(metrics) = &self.metrics {
            metrics.candles_persisted_total.inc_by(candles.len() as u64);
        }
        candles.clear();
        Ok(())
    }

    fn report_progress(&self, job: &CollectionJob, percent: u8) {
        self.progress.set_percent(percent);
        if let Some(metrics) = &self.metrics {
            metrics.current_step_percent.set(f64::from(percent));
        }
        info!(
            "[{}%] historical data fetched for {} {}",
            percent,
            job.symbol,
            job.time_frame
        );
    }

    async fn collect_ticker(&mut self, _symbol: &str) -> Result<()> {
        Ok(())
    }

    async fn collect_order_book(&mut self, _symbol: &str) -> Result<()> {
        Ok(())
    }

    async fn collect_recent_trades(&mut self, _symbol: &str) -> Result<()> {
        Ok(())
    }

    async fn collect_kline(&mut self, _job: &CollectionJob) -> Result<()> {
        Ok(())
    }

    /// Single cleanup point: the store is stopped and the exchange released
    /// exactly once, whatever happened during collection.
    async fn finish(&mut self, result: Result<()>) -> Result<RunOutcome> {
        let stopped = self.store.stop().await;
        if let Err(e) = self.exchange.close().await {
            warn!(exchange = %self.exchange_name, error = %e, "Failed to close exchange connection");
        }
        let result = result.and(stopped);

        if self.progress.should_stop() {
            if let Err(e) = &result {
                debug!(error = %e, "Ignoring error raised while stopping");
            }
            self.discard_artifact().await;
            self.progress.complete(RunState::Stopped);
            self.record_run("stopped");
            info!(exchange = %self.exchange_name, "Historical data collection stopped");
            return Ok(RunOutcome::Stopped);
        }

        let finalized = match result {
            Ok(()) => self.store.finalize().await,
            Err(e) => Err(e),
        };
        match finalized {
            Ok(path) => {
                self.progress.complete(RunState::Finished);
                self.record_run("finished");
                info!(
                    exchange = %self.exchange_name,
                    path = %path.display(),
                    "Historical data collection finished"
                );
                Ok(RunOutcome::Finished(path))
            }
            Err(e) => {
                self.discard_artifact().await;
                self.progress.complete(RunState::Errored);
                self.record_run("errored");
                let err = self.wrap_error(e);
                error!(exchange = %self.exchange_name, error = %err, "Historical data collection failed");
                Err(err)
            }
        }
    }

    async fn discard_artifact(&mut self) {
        if let Err(e) = self.store.discard().await {
            warn!(
                path = %self.store.artifact_path().display(),
                error = %e,
                "Failed to delete candle artifact"
            );
        }
    }

    fn wrap_error(&self, err: CollectorError) -> CollectorError {
        match err {
            wrapped @ CollectorError::Collection { .. } => wrapped,
            other => CollectorError::Collection {
                exchange: self.exchange_name.clone(),
                symbols: self.symbols.join(", "),
                source: Box::new(other),
            },
        }
    }

    fn record_run(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_run(outcome);
        }
    }
}
