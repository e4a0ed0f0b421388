//! Error types for recording and replay

use thiserror::Error;

/// Recording and replay errors
#[derive(Error, Debug)]
pub enum Error {
    /// Event is missing a field its kind requires, or carries one it must not
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Action cannot be expressed by the active backend
    #[error("Unsupported capability: {0}")]
    UnsupportedCapability(String),

    /// Stored sequence is malformed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Failed to read or write a sequence file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to encode or decode sequence JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Component was started while already running
    #[error("{0} is already running")]
    AlreadyRunning(&'static str),

    /// Component was stopped while not running
    #[error("{0} is not running")]
    NotRunning(&'static str),

    /// Injection or observation backend reported a failure
    #[error("Backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Whether this error came from loading or saving a sequence.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Io(_) | Self::Json(_))
    }
}

/// Result type for recording and replay operations
pub type Result<T> = std::result::Result<T, Error>;
