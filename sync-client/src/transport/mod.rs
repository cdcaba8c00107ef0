//! Transport abstraction for vsync.
//!
//! This module provides a pluggable transport layer that abstracts
//! the underlying byte stream (TCP, mock for testing).
//!
//! # Design
//!
//! The transport trait is async and connection-oriented:
//! - `connect()` establishes a connection
//! - `send()` writes one complete frame
//! - `recv()` yields one complete frame, reassembled from the stream
//! - `close()` terminates the connection
//!
//! `send()` and `recv()` may run concurrently on the same transport; the
//! client keeps a reader task blocked in `recv()` while it sends.
//!
//! # Example
//!
//! ```ignore
//! let transport = TcpTransport::new(DEFAULT_MAX_FRAME_SIZE);
//! transport.connect("127.0.0.1:3000").await?;
//! transport.send(&Message::open_file("/tmp/x").to_frame()?).await?;
//! let frame = transport.recv().await?;
//! ```

mod mock;
mod tcp;

pub use mock::MockTransport;
pub use tcp::{TcpTransport, DEFAULT_CONNECT_TIMEOUT};

use async_trait::async_trait;
use thiserror::Error;
use vsync_types::CodecError;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed by the remote end.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// The stream violated framing (e.g. an oversized frame).
    #[error("framing error: {0}")]
    Frame(#[from] CodecError),

    /// Connection timeout.
    #[error("connection timeout")]
    Timeout,
}

/// Transport trait for exchanging framed sync messages with the relay.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the relay at `address` (`host:port`).
    async fn connect(&self, address: &str) -> Result<(), TransportError>;

    /// Write one complete frame.
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError>;

    /// Receive the next complete frame.
    ///
    /// Blocks until a frame is available or the connection ends.
    async fn recv(&self) -> Result<Vec<u8>, TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection. Closing a closed transport is a no-op.
    async fn close(&self) -> Result<(), TransportError>;
}
