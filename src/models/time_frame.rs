use crate::error::CollectorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MINUTE_TO_MS: i64 = 60_000;

/// Candle resolutions the collector knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeFrame {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "3m")]
    ThreeMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "2h")]
    TwoHours,
    #[serde(rename = "3h")]
    ThreeHours,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "8h")]
    EightHours,
    #[serde(rename = "12h")]
    TwelveHours,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "3d")]
    ThreeDays,
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
}

impl TimeFrame {
    pub const ALL: [TimeFrame; 16] = [
        TimeFrame::OneMinute,
        TimeFrame::ThreeMinutes,
        TimeFrame::FiveMinutes,
        TimeFrame::FifteenMinutes,
        TimeFrame::ThirtyMinutes,
        TimeFrame::OneHour,
        TimeFrame::TwoHours,
        TimeFrame::ThreeHours,
        TimeFrame::FourHours,
        TimeFrame::SixHours,
        TimeFrame::EightHours,
        TimeFrame::TwelveHours,
        TimeFrame::OneDay,
        TimeFrame::ThreeDays,
        TimeFrame::OneWeek,
        TimeFrame::OneMonth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFrame::OneMinute => "1m",
            TimeFrame::ThreeMinutes => "3m",
            TimeFrame::FiveMinutes => "5m",
            TimeFrame::FifteenMinutes => "15m",
            TimeFrame::ThirtyMinutes => "30m",
            TimeFrame::OneHour => "1h",
            TimeFrame::TwoHours => "2h",
            TimeFrame::ThreeHours => "3h",
            TimeFrame::FourHours => "4h",
            TimeFrame::SixHours => "6h",
            TimeFrame::EightHours => "8h",
            TimeFrame::TwelveHours => "12h",
            TimeFrame::OneDay => "1d",
            TimeFrame::ThreeDays => "3d",
            TimeFrame::OneWeek => "1w",
            TimeFrame::OneMonth => "1M",
        }
    }

    /// Duration of one candle in minutes. A month counts as 30 days.
    pub fn minutes(&self) -> i64 {
        match self {
            TimeFrame::OneMinute => 1,
            TimeFrame::ThreeMinutes => 3,
            TimeFrame::FiveMinutes => 5,
            TimeFrame::FifteenMinutes => 15,
            TimeFrame::ThirtyMinutes => 30,
            TimeFrame::OneHour => 60,
            TimeFrame::TwoHours => 120,
            TimeFrame::ThreeHours => 180,
            TimeFrame::FourHours => 240,
            TimeFrame::SixHours => 360,
            TimeFrame::EightHours => 480,
            TimeFrame::TwelveHours => 720,
            TimeFrame::OneDay => 1_440,
            TimeFrame::ThreeDays => 4_320,
            TimeFrame::OneWeek => 10_080,
            TimeFrame::OneMonth => 43_200,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.minutes() * MINUTE_TO_MS
    }

    /// Keeps the exchange's advertised resolutions that map to a known time frame,
    /// in the exchange's order, without duplicates.
    pub fn intersect_supported<S: AsRef<str>>(advertised: &[S]) -> Vec<TimeFrame> {
        let mut time_frames = Vec::new();
        for raw in advertised {
            if let Ok(tf) = raw.as_ref().parse::<TimeFrame>() {
                if !time_frames.contains(&tf) {
                    time_frames.push(tf);
                }
            }
        }
        time_frames
    }
}

/// The shortest time frame of the set, `None` when empty.
pub fn find_min_time_frame(time_frames: &[TimeFrame]) -> Option<TimeFrame> {
    time_frames.iter().copied().min_by_key(|tf| tf.minutes())
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFrame {
    type Err = CollectorError;

    /// Case-sensitive: `1m` is one minute, `1M` one month.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeFrame::ALL
            .iter()
            .copied()
            .find(|tf| tf.as_str() == s.trim())
            .ok_or_else(|| CollectorError::Configuration(format!("Unknown time frame: {}", s)))
    }
}
