//! Error types shared by the registry, the store seam and the coordinator

use thiserror::Error;

/// Failures reported by a persistent key-value store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid store key '{0}'")]
    InvalidKey(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failures of the timer core
#[derive(Error, Debug)]
pub enum TimerError {
    /// User-supplied fields were missing or not numeric; nothing was mutated
    #[error("{0}")]
    Validation(String),

    #[error("failed to read timers from store: {0}")]
    StoreRead(#[source] StoreError),

    #[error("failed to write timers to store: {0}")]
    StoreWrite(#[source] StoreError),

    #[error("stored timer data is malformed: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("stored timer snapshot has unsupported version {0}")]
    UnsupportedVersion(u32),

    /// The coordinator task is no longer running
    #[error("timer service is not running")]
    ServiceClosed,
}

pub type Result<T, E = TimerError> = std::result::Result<T, E>;
