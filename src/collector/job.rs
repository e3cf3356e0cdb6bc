use crate::models::TimeFrame;

/// One (symbol, time frame) unit of work, fixed when the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionJob {
    pub exchange: String,
    pub symbol: String,
    pub time_frame: TimeFrame,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl CollectionJob {
    pub fn new(
        exchange: impl Into<String>,
        symbol: impl Into<String>,
        time_frame: TimeFrame,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            symbol: symbol.into(),
            time_frame,
            start,
            end,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.time_frame.duration_ms()
    }
}
