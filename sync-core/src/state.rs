//! Connection state machine for vsync.
//!
//! This module provides a pure, side-effect-free state machine for managing
//! the connection lifecycle of one peer. The state machine takes events as
//! input and produces a new state plus a list of actions to execute.
//!
//! The actual I/O (connecting, closing sockets, arming timers) is performed by
//! sync-client, not by this module.

use std::time::Duration;

/// Default delay before a reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Connection state machine - NO I/O, just state transitions.
///
/// `Disabled` is left only through [`Event::EnableRequested`] and entered
/// only through [`Event::DisableRequested`]; network failures never disable
/// synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Synchronization is turned off.
    Disabled,
    /// A connect attempt is in flight.
    Connecting {
        /// 1-based attempt number since the last successful connection.
        attempt: u32,
    },
    /// A live connection to the relay exists.
    Connected,
    /// No connection; a reconnect attempt is scheduled.
    Disconnected {
        /// Consecutive failed attempts (0 after an established link dropped).
        failures: u32,
    },
}

impl ConnectionState {
    /// Create a new state machine in the Disabled state.
    pub fn new() -> Self {
        Self::Disabled
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. Events that make no sense in
    /// the current state (a stale timer, a second enable) leave the state
    /// unchanged and produce no actions.
    pub fn on_event(self, event: Event, policy: &ReconnectPolicy) -> (Self, Vec<Action>) {
        match (self, event) {
            // From Disabled
            (Self::Disabled, Event::EnableRequested) => {
                (Self::Connecting { attempt: 1 }, vec![Action::Connect])
            }

            // From Connecting
            (Self::Connecting { .. }, Event::ConnectSucceeded) => (
                Self::Connected,
                vec![Action::EmitEvent(SyncEvent::Connected)],
            ),
            (Self::Connecting { attempt }, Event::ConnectFailed { error }) => (
                Self::Disconnected { failures: attempt },
                vec![
                    Action::EmitEvent(SyncEvent::Error { reason: error }),
                    Action::StartReconnectTimer {
                        delay: policy.delay(),
                    },
                ],
            ),
            (Self::Connecting { .. }, Event::DisableRequested) => {
                (Self::Disabled, vec![Action::Disconnect])
            }

            // From Connected
            (Self::Connected, Event::ConnectionLost { reason }) => (
                Self::Disconnected { failures: 0 },
                vec![
                    Action::Disconnect,
                    Action::EmitEvent(SyncEvent::Disconnected { reason }),
                    Action::StartReconnectTimer {
                        delay: policy.delay(),
                    },
                ],
            ),
            (Self::Connected, Event::DisableRequested) => (
                Self::Disabled,
                vec![
                    Action::Disconnect,
                    Action::EmitEvent(SyncEvent::Disconnected {
                        reason: "sync disabled".into(),
                    }),
                ],
            ),

            // From Disconnected
            (Self::Disconnected { failures }, Event::ReconnectTimer) => (
                Self::Connecting {
                    attempt: failures.saturating_add(1),
                },
                vec![Action::Connect],
            ),
            (Self::Disconnected { .. }, Event::DisableRequested) => {
                (Self::Disabled, vec![Action::CancelReconnect])
            }

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Whether the user has synchronization turned on.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Check if currently connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if a connect attempt is in flight.
    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting { .. })
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events that can occur in the connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// User turned synchronization on.
    EnableRequested,
    /// User turned synchronization off.
    DisableRequested,
    /// Transport connection succeeded.
    ConnectSucceeded,
    /// Transport connection failed.
    ConnectFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// An established connection was lost (read/write error or clean close).
    ConnectionLost {
        /// Reason for disconnection.
        reason: String,
    },
    /// Reconnect timer fired.
    ReconnectTimer,
}

/// Actions to be executed by the caller.
///
/// These are instructions, not side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Initiate a transport connection.
    Connect,
    /// Close the transport and abandon any in-flight connect.
    Disconnect,
    /// Start a timer for reconnection.
    StartReconnectTimer {
        /// Delay before attempting reconnection.
        delay: Duration,
    },
    /// Cancel any pending reconnect timer.
    CancelReconnect,
    /// Emit a lifecycle notification.
    EmitEvent(SyncEvent),
}

/// Lifecycle notifications emitted to observers (e.g. a status indicator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Successfully connected to the relay.
    Connected,
    /// An established connection ended.
    Disconnected {
        /// Reason for disconnection.
        reason: String,
    },
    /// A connect attempt failed.
    Error {
        /// Error message describing the failure.
        reason: String,
    },
}

impl std::fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncEvent::Connected => f.write_str("connected"),
            SyncEvent::Disconnected { reason } => write!(f, "disconnected ({reason})"),
            SyncEvent::Error { reason } => write!(f, "error: {reason}"),
        }
    }
}

/// Reconnection timing.
///
/// The delay is fixed: every failed attempt schedules exactly one further
/// attempt after the same interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    delay: Duration,
}

impl ReconnectPolicy {
    /// Policy with a fixed delay between attempts.
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    /// Delay before the next attempt.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RECONNECT_DELAY)
    }
}

/// User-facing summary of the sync state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Synchronization is disabled.
    Off,
    /// Enabled, but no live connection yet.
    Connecting,
    /// Enabled and connected.
    On,
}

impl SyncStatus {
    /// Derive the status from a connection state.
    pub fn from_state(state: &ConnectionState) -> Self {
        match state {
            ConnectionState::Disabled => SyncStatus::Off,
            ConnectionState::Connected => SyncStatus::On,
            ConnectionState::Connecting { .. } | ConnectionState::Disconnected { .. } => {
                SyncStatus::Connecting
            }
        }
    }

    /// Short label for a status indicator.
    pub fn label(self) -> &'static str {
        match self {
            SyncStatus::Off => "Sync: Off",
            SyncStatus::Connecting => "Sync: Connecting...",
            SyncStatus::On => "Sync: On",
        }
    }

    /// Hint describing what toggling will do.
    pub fn tooltip(self) -> &'static str {
        match self {
            SyncStatus::Off => "Toggle to connect",
            SyncStatus::Connecting | SyncStatus::On => "Toggle to disconnect",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
