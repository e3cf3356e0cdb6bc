//! Error kinds surfaced by the history collector.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectorError {
    /// Invalid or contradictory settings, detected before anything is persisted.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Exchange fetch failure (connectivity, rate limit, bad payload).
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// Another run already owns the supervisor.
    #[error("Historical data collector is already running")]
    AlreadyRunning,

    /// Any fault raised while a run was in progress.
    #[error("Error when collecting {exchange} history for {symbols}: {source}")]
    Collection {
        exchange: String,
        symbols: String,
        #[source]
        source: Box<CollectorError>,
    },
}

impl CollectorError {
    /// Returns the innermost error kind, looking through `Collection` wrappers.
    pub fn root(&self) -> &CollectorError {
        match self {
            Self::Collection { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<std::io::Error> for CollectorError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for CollectorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for CollectorError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CollectorError>;
