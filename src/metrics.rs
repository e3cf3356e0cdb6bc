//! Prometheus metrics for collection runs.

use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub struct CollectorMetrics {
    registry: Registry,
    pub pages_fetched_total: IntCounter,
    pub candles_persisted_total: IntCounter,
    /// Labelled by `outcome`: finished, stopped, errored.
    pub runs_total: IntCounterVec,
    pub current_step_percent: Gauge,
}

impl CollectorMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let pages_fetched_total = IntCounter::new(
            "collector_pages_fetched_total",
            "Candle pages fetched from the exchange",
        )?;
        let candles_persisted_total = IntCounter::new(
            "collector_candles_persisted_total",
            "Candles appended to the run artifact",
        )?;
        let runs_total = IntCounterVec::new(
            Opts::new("collector_runs_total", "Collection runs by outcome"),
            &["outcome"],
        )?;
        let current_step_percent = Gauge::new(
            "collector_current_step_percent",
            "Progress of the current (symbol, time frame) job",
        )?;

        registry.register(Box::new(pages_fetched_total.clone()))?;
        registry.register(Box::new(candles_persisted_total.clone()))?;
        registry.register(Box::new(runs_total.clone()))?;
        registry.register(Box::new(current_step_percent.clone()))?;

        Ok(Self {
            registry,
            pages_fetched_total,
            candles_persisted_total,
            runs_total,
            current_step_percent,
        })
    }

    pub fn record_run(&self, outcome: &str) {
        self.runs_total.with_label_values(&[outcome]).inc();
    }

    /// Text exposition format.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
