//! # sync-client
//!
//! Peer runtime for vsync editor view synchronization.
//!
//! Connects one editor to a relay, publishes the editor's active document
//! and cursor, and applies the same changes received from other peers.
//!
//! ## Features
//!
//! - **Echo Suppression**: remote changes applied locally are not re-sent
//! - **Cursor Debounce**: bursts of cursor moves become one message
//! - **Automatic Reconnect**: fixed-delay retry while sync is enabled
//! - **Transport Abstraction**: Pluggable transport layer (TCP, mock)
//! - **Pure State Machine**: Uses sync-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use vsync_client::{ClientConfig, SyncClient, TcpTransport};
//!
//! let config = ClientConfig::new("127.0.0.1", 3000);
//! let transport = TcpTransport::new(config.max_frame_size);
//! let handle = SyncClient::new(config, transport, my_editor).spawn();
//!
//! handle.enable()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod client;
pub mod config;
pub mod transport;

pub use adapter::{ApplyError, EditorAdapter, RecordingAdapter};
pub use client::{ClientError, SyncClient, SyncHandle};
pub use config::{ClientConfig, ConfigError, RelayAddress, TimingConfig};
pub use transport::{
    MockTransport, TcpTransport, Transport, TransportError, DEFAULT_CONNECT_TIMEOUT,
};
pub use vsync_core::{LocalEvent, SyncEvent, SyncStatus};
