//! Error types for webcal-sync.

use thiserror::Error;

/// Errors that can occur while planning or applying a feed sync.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown id format '{0}' (expected \"\", \"uid\" or \"url\")")]
    UnknownIdFormat(String),

    #[error("Malformed timestamp '{value}' on destination event {event_id}")]
    MalformedTimestamp { event_id: String, value: String },

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for webcal-sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
