//! Error types for the vsync wire format.

use thiserror::Error;

/// Errors produced while encoding, decoding or framing messages.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The frame contained no payload.
    #[error("empty frame")]
    Empty,

    /// The frame was not valid UTF-8.
    #[error("frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The payload was not a well-formed message object.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The `type` discriminant is not one this build understands.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// The message path is empty or not absolute.
    #[error("invalid path {path:?}: must be a non-empty absolute path")]
    InvalidPath {
        /// The rejected path.
        path: String,
    },

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// A single frame grew beyond the configured limit.
    #[error("frame too large: {size} bytes (limit: {limit} bytes)")]
    FrameTooLarge {
        /// Bytes buffered for the frame so far.
        size: usize,
        /// Maximum allowed frame size.
        limit: usize,
    },
}

impl CodecError {
    /// Whether the error only means "sent by a newer peer".
    ///
    /// Receivers ignore unknown message types quietly instead of treating
    /// them as corruption.
    pub fn is_unknown_type(&self) -> bool {
        matches!(self, CodecError::UnknownType(_))
    }
}
