//! External service connectors.

pub mod hyperliquid;
pub mod market_data;

pub use hyperliquid::HyperliquidRestClient;
pub use market_data::ExchangeClient;
