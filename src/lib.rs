//! Perptrix history collector
//!
//! Pages historical candles out of an exchange for a set of symbols and time
//! frames, and persists them into a single data file per run.

pub mod collector;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;

pub use error::{CollectorError, Result};
