//! # sync-core
//!
//! Pure logic for vsync (no I/O, instant tests).
//!
//! This crate implements the peer sync engine without any network, timer or
//! editor I/O, enabling fast deterministic unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input (including the
//! current time) and produce output without side effects. This enables:
//! - Instant unit tests (no mocks, no async, no sleeps)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (network, editor, timers) is performed by `sync-client`,
//! which interprets the [`Effect`]s produced by [`SyncEngine`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod debounce;
pub mod engine;
pub mod state;
pub mod suppress;

pub use debounce::CursorDebouncer;
pub use engine::{Effect, LocalEvent, SyncEngine, Timing};
pub use state::{Action, ConnectionState, Event, ReconnectPolicy, SyncEvent, SyncStatus};
pub use suppress::SuppressionWindow;
