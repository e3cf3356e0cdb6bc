//! Requested time window and page clamping.

use crate::error::{CollectorError, Result};
use crate::models::Candle;

/// Current wall-clock time in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Optional `[start, end]` bounds in milliseconds, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeWindow {
    start: Option<i64>,
    end: Option<i64>,
}

impl TimeWindow {
    pub fn new(start: Option<i64>, end: Option<i64>) -> Result<Self> {
        let window = Self { start, end };
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(CollectorError::Configuration(format!(
                    "Start timestamp {} is after end timestamp {}",
                    start, end
                )));
            }
        }
        Ok(window)
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<i64> {
        self.start
    }

    pub fn end(&self) -> Option<i64> {
        self.end
    }

    /// Moves the start up to `floor` when it is below it. No-op without a start.
    pub fn raise_start(&mut self, floor: i64) -> bool {
        match self.start {
            Some(start) if start < floor => {
                self.start = Some(floor);
                true
            }
            _ => false,
        }
    }

    /// Explicit end, or `now` when unbounded.
    pub fn effective_end(&self, now: i64) -> i64 {
        self.end.unwrap_or(now)
    }

    /// Fails when the start lies after the explicit end (or after `now`).
    pub fn validate(&self, now: i64) -> Result<()> {
        if let Some(start) = self.start {
            let end = self.effective_end(now);
            if start > end {
                let bound = if self.end.is_some() { "end timestamp" } else { "current time" };
                return Err(CollectorError::Configuration(format!(
                    "Start timestamp {} is after the {} {}",
                    start, bound, end
                )));
            }
        }
        Ok(())
    }
}

/// Drop every candle opening after `end`.
pub fn trim_to_end(candles: &mut Vec<Candle>, end: i64) {
    candles.retain(|c| c.open_time <= end);
}

/// Whether at least one full candle of `duration_ms` fits in `[start, end]`.
pub fn has_room_for_candle(start: i64, end: i64, duration_ms: i64) -> bool {
    end - start >= duration_ms
}
