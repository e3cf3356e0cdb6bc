//! Unit tests for the default exchange client behaviour

use perptrix_history::error::Result;
use perptrix_history::models::{Candle, TimeFrame};
use perptrix_history::services::ExchangeClient;

struct StaticExchange;

#[async_trait::async_trait]
impl ExchangeClient for StaticExchange {
    fn name(&self) -> &str {
        "static"
    }

    async fn get_symbol_prices(
        &self,
        _symbol: &str,
        _time_frame: TimeFrame,
        _since: Option<i64>,
        _limit: Option<usize>,
    ) -> Result<Vec<Candle>> {
        Ok(Vec::new())
    }

    fn available_time_frames(&self) -> Vec<String> {
        vec!["1m".to_string()]
    }
}

fn candle(open_time: i64, close: f64) -> Candle {
    Candle::new(open_time, 1.0, 2.0, 0.5, close, 3.0)
}

#[test]
fn uniformize_sorts_and_keeps_latest_duplicate() {
    let mut page = vec![candle(120, 1.0), candle(0, 1.0), candle(60, 1.0), candle(120, 2.0)];

    StaticExchange.uniformize_candles(&mut page);

    assert_eq!(page.iter().map(|c| c.open_time).collect::<Vec<_>>(), vec![0, 60, 120]);
    assert_eq!(page[2].close, 2.0);
}

#[test]
fn pair_cryptocurrency_is_the_base_asset() {
    assert_eq!(StaticExchange.get_pair_cryptocurrency("BTC/USDC"), "BTC");
    assert_eq!(StaticExchange.get_pair_cryptocurrency("ETH-PERP"), "ETH");
    assert_eq!(StaticExchange.get_pair_cryptocurrency("SOL/USDC:USDC"), "SOL");
    assert_eq!(StaticExchange.get_pair_cryptocurrency("HYPE"), "HYPE");
}

#[tokio::test]
async fn default_close_is_a_no_op() {
    assert!(StaticExchange.close().await.is_ok());
}
