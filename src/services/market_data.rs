//! Exchange-facing interface consumed by the history collector.

use crate::error::Result;
use crate::models::{Candle, TimeFrame};

/// A paged historical candle source for one exchange.
#[async_trait::async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Exchange identifier, e.g. `hyperliquid`.
    fn name(&self) -> &str;

    /// Fetch one page of candles for `symbol` at `time_frame`, ascending by open time.
    ///
    /// `since` is the earliest open time wanted (ms). Without it the exchange
    /// returns its default, most recent page. `limit` caps the page size.
    async fn get_symbol_prices(
        &self,
        symbol: &str,
        time_frame: TimeFrame,
        since: Option<i64>,
        limit: Option<usize>,
    ) -> Result<Vec<Candle>>;

    /// Resolution strings the exchange advertises. Unknown entries are
    /// filtered out by the caller.
    fn available_time_frames(&self) -> Vec<String>;

    /// Normalize a page in place before it is persisted.
    ///
    /// Default: sort by open time and drop repeated open times, keeping the
    /// last occurrence (the most recently updated candle).
    fn uniformize_candles(&self, candles: &mut Vec<Candle>) {
        candles.sort_by_key(|c| c.open_time);
        let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
        for candle in candles.drain(..) {
            match deduped.last_mut() {
                Some(last) if last.open_time == candle.open_time => *last = candle,
                _ => deduped.push(candle),
            }
        }
        *candles = deduped;
    }

    /// Base asset of a trading pair: `BTC/USDT` → `BTC`, `ETH-PERP` → `ETH`, `SOL` → `SOL`.
    fn get_pair_cryptocurrency(&self, symbol: &str) -> String {
        symbol
            .split(['/', '-', ':'])
            .next()
            .unwrap_or(symbol)
            .to_string()
    }

    /// Release the underlying connection. Called once per run.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
