//! Hyperliquid market data connector

pub mod messages;
pub mod rest;

pub use rest::{HyperliquidRestClient, MAX_CANDLES_PER_REQUEST};
