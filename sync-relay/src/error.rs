//! Error types for sync-relay.

use vsync_types::CodecError;

/// Main error type for sync-relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a peer session ended abnormally.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Reading from the peer failed.
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    /// Writing to the peer failed.
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    /// The peer violated framing (oversized frame).
    #[error("framing error: {0}")]
    Frame(#[from] CodecError),

    /// The writer task ended unexpectedly.
    #[error("writer task failed: {0}")]
    Writer(String),
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Result type alias for session operations.
pub type SessionResult<T> = std::result::Result<T, SessionError>;
