//! Shared data models.

pub mod candle;
pub mod time_frame;

pub use candle::Candle;
pub use time_frame::{find_min_time_frame, TimeFrame, MINUTE_TO_MS};
