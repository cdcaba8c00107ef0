//! # sync-relay
//!
//! Broadcast relay server for vsync.
//!
//! This crate implements a relay server that:
//! - Accepts TCP connections from any number of editor peers
//! - Forwards every frame a peer sends to every other connected peer
//! - Never decodes, validates or stores message content
//!
//! ## Architecture
//!
//! ```text
//! Peer A ──┐                      ┌── Peer B
//!          │   newline frames     │
//!          ├─────────────────────►│
//!          │                      │
//!      ┌───┴──────────────────────┴───┐
//!      │          sync-relay          │
//!      │  ┌────────────────────────┐  │
//!      │  │  PeerSet (in memory)   │  │
//!      │  └────────────────────────┘  │
//!      └──────────────────────────────┘
//! ```
//!
//! Each peer is served by a session task that reads frames and a writer task
//! that drains the peer's bounded outbound queue. A peer whose queue is full
//! or whose socket fails is dropped without affecting the others.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod session;

pub use config::{ConfigError, RelayConfig};
pub use error::{RelayError, SessionError};
pub use protocol::RelayServer;
pub use server::{PeerId, PeerSet, Relay, RelayMetrics};
