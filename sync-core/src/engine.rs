//! The per-peer sync engine.
//!
//! [`SyncEngine`] owns all synchronization state of one local participant:
//! the connection lifecycle, the echo suppression window, the pending
//! debounced cursor move and the reconnect deadline. Every operation takes the
//! current time and returns the [`Effect`]s the caller must perform, so the
//! engine is deterministic and testable without timers.
//!
//! ```text
//! editor ──LocalEvent──► SyncEngine ──Effect::Send──► transport
//! transport ──frame────► SyncEngine ──Effect::Apply─► editor
//! ```

use std::time::{Duration, Instant};

use vsync_types::{CodecError, Message};

use crate::debounce::{CursorDebouncer, DEFAULT_DEBOUNCE};
use crate::state::{
    Action, ConnectionState, Event, ReconnectPolicy, SyncEvent, SyncStatus,
    DEFAULT_RECONNECT_DELAY,
};
use crate::suppress::SuppressionWindow;

/// Timing constants of the engine.
///
/// Correctness only requires the suppression windows to outlast the editor
/// host's own event dispatch latency; the defaults are the reference values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Delay before each reconnect attempt.
    pub reconnect_delay: Duration,
    /// Quiet period before a cursor move is sent.
    pub debounce: Duration,
    /// Suppression after applying a remote open/close.
    pub open_close_suppression: Duration,
    /// Suppression after applying a remote cursor move.
    pub cursor_suppression: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            debounce: DEFAULT_DEBOUNCE,
            open_close_suppression: Duration::from_millis(100),
            cursor_suppression: Duration::from_millis(50),
        }
    }
}

/// An event observed in the local editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalEvent {
    /// The focused document changed.
    ActiveDocumentChanged {
        /// Absolute path of the newly focused document.
        path: String,
    },
    /// A document was closed.
    DocumentClosed {
        /// Absolute path of the closed document.
        path: String,
    },
    /// The primary cursor moved.
    SelectionChanged {
        /// Absolute path of the document.
        path: String,
        /// Zero-based line.
        line: u32,
        /// Zero-based column.
        character: u32,
    },
}

impl LocalEvent {
    /// The document the event refers to.
    pub fn path(&self) -> &str {
        match self {
            LocalEvent::ActiveDocumentChanged { path }
            | LocalEvent::DocumentClosed { path }
            | LocalEvent::SelectionChanged { path, .. } => path,
        }
    }
}

impl From<LocalEvent> for Message {
    fn from(event: LocalEvent) -> Self {
        match event {
            LocalEvent::ActiveDocumentChanged { path } => Message::OpenFile { path },
            LocalEvent::DocumentClosed { path } => Message::CloseFile { path },
            LocalEvent::SelectionChanged {
                path,
                line,
                character,
            } => Message::CursorMove {
                path,
                line,
                column: character,
            },
        }
    }
}

/// Side effects requested by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a transport to the relay.
    Connect,
    /// Close the transport and abandon any in-flight connect.
    Disconnect,
    /// Encode and write a message to the relay.
    Send(Message),
    /// Apply a remote change to the local editor.
    Apply(Message),
    /// Publish a lifecycle notification.
    Notify(SyncEvent),
}

/// Synchronization state of one local participant.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    timing: Timing,
    policy: ReconnectPolicy,
    connection: ConnectionState,
    suppression: SuppressionWindow,
    debouncer: CursorDebouncer,
    retry_deadline: Option<Instant>,
}

impl SyncEngine {
    /// Create a disabled, disconnected engine.
    pub fn new(timing: Timing) -> Self {
        Self {
            timing,
            policy: ReconnectPolicy::fixed(timing.reconnect_delay),
            connection: ConnectionState::Disabled,
            suppression: SuppressionWindow::new(),
            debouncer: CursorDebouncer::new(timing.debounce),
            retry_deadline: None,
        }
    }

    // ===========================================
    // Lifecycle
    // ===========================================

    /// Turn synchronization on. No-op if already enabled.
    pub fn enable(&mut self, now: Instant) -> Vec<Effect> {
        self.transition(now, Event::EnableRequested)
    }

    /// Turn synchronization off and clear every deadline. No-op if disabled.
    pub fn disable(&mut self, now: Instant) -> Vec<Effect> {
        let effects = self.transition(now, Event::DisableRequested);
        self.suppression.clear();
        self.debouncer.cancel();
        self.retry_deadline = None;
        effects
    }

    /// Flip between enabled and disabled.
    pub fn toggle(&mut self, now: Instant) -> Vec<Effect> {
        if self.connection.is_enabled() {
            self.disable(now)
        } else {
            self.enable(now)
        }
    }

    /// The transport finished connecting.
    pub fn connect_succeeded(&mut self, now: Instant) -> Vec<Effect> {
        self.transition(now, Event::ConnectSucceeded)
    }

    /// The transport failed to connect.
    pub fn connect_failed(&mut self, now: Instant, error: impl Into<String>) -> Vec<Effect> {
        self.transition(
            now,
            Event::ConnectFailed {
                error: error.into(),
            },
        )
    }

    /// An established connection failed or was closed by the remote end.
    pub fn connection_lost(&mut self, now: Instant, reason: impl Into<String>) -> Vec<Effect> {
        self.transition(
            now,
            Event::ConnectionLost {
                reason: reason.into(),
            },
        )
    }

    // ===========================================
    // Outbound
    // ===========================================

    /// Handle an event reported by the local editor.
    ///
    /// Events inside the suppression window or without a live connection are
    /// dropped. Open/close are sent at once; cursor moves are debounced.
    /// Returns an error only if the event's path is not absolute.
    pub fn local_event(
        &mut self,
        now: Instant,
        event: LocalEvent,
    ) -> Result<Vec<Effect>, CodecError> {
        let message = Message::from(event);
        message.validate()?;

        if self.suppression.is_active(now) || !self.connection.is_connected() {
            return Ok(vec![]);
        }

        match message {
            Message::CursorMove { .. } => {
                self.debouncer.push(now, message);
                Ok(vec![])
            }
            Message::OpenFile { .. } | Message::CloseFile { .. } => Ok(vec![Effect::Send(message)]),
        }
    }

    // ===========================================
    // Inbound
    // ===========================================

    /// Decode and handle one frame received from the relay.
    ///
    /// A frame that fails to decode leaves the engine untouched.
    pub fn inbound_frame(
        &mut self,
        now: Instant,
        frame: &[u8],
        active_document: Option<&str>,
    ) -> Result<Vec<Effect>, CodecError> {
        let message = Message::from_bytes(frame)?;
        Ok(self.inbound(now, message, active_document))
    }

    /// Handle one decoded remote message.
    ///
    /// The suppression window is armed before the apply effect is returned,
    /// so the editor's echo of the change is dropped. Cursor moves for a
    /// document other than `active_document` are ignored.
    pub fn inbound(
        &mut self,
        now: Instant,
        message: Message,
        active_document: Option<&str>,
    ) -> Vec<Effect> {
        if !self.connection.is_connected() {
            return vec![];
        }

        if let Message::CursorMove { path, .. } = &message {
            if active_document != Some(path.as_str()) {
                return vec![];
            }
        }
        self.suppression.extend(now, self.window_for(&message));
        vec![Effect::Apply(message)]
    }

    /// Record that the editor finished applying `message` at `now`.
    ///
    /// Re-arms the suppression window from the completion time, so an editor
    /// that takes longer than the window to apply still has its echo dropped.
    pub fn applied(&mut self, now: Instant, message: &Message) {
        self.suppression.extend(now, self.window_for(message));
    }

    fn window_for(&self, message: &Message) -> Duration {
        match message {
            Message::OpenFile { .. } | Message::CloseFile { .. } => {
                self.timing.open_close_suppression
            }
            Message::CursorMove { .. } => self.timing.cursor_suppression,
        }
    }

    // ===========================================
    // Timers
    // ===========================================

    /// Fire every deadline that has passed at `now`.
    pub fn poll_timers(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();

        if self.retry_deadline.is_some_and(|deadline| deadline <= now) {
            self.retry_deadline = None;
            effects.extend(self.transition(now, Event::ReconnectTimer));
        }

        if let Some(message) = self.debouncer.poll(now) {
            if self.connection.is_connected() {
                effects.push(Effect::Send(message));
            }
        }

        effects
    }

    /// The earliest pending deadline (reconnect or debounce).
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.retry_deadline, self.debouncer.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ===========================================
    // Accessors
    // ===========================================

    /// Current connection state.
    pub fn state(&self) -> &ConnectionState {
        &self.connection
    }

    /// User-facing status.
    pub fn status(&self) -> SyncStatus {
        SyncStatus::from_state(&self.connection)
    }

    /// Whether synchronization is turned on.
    pub fn is_enabled(&self) -> bool {
        self.connection.is_enabled()
    }

    /// Whether a live connection exists.
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Whether local events at `now` fall inside the suppression window.
    pub fn is_suppressed(&self, now: Instant) -> bool {
        self.suppression.is_active(now)
    }

    /// End of the suppression window.
    pub fn suppressed_until(&self) -> Option<Instant> {
        self.suppression.until()
    }

    /// The debounced cursor move waiting to be sent.
    pub fn pending_cursor(&self) -> Option<&Message> {
        self.debouncer.pending()
    }

    /// When the next reconnect attempt is due.
    pub fn retry_deadline(&self) -> Option<Instant> {
        self.retry_deadline
    }

    /// Timing constants in use.
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    fn transition(&mut self, now: Instant, event: Event) -> Vec<Effect> {
        let state = std::mem::take(&mut self.connection);
        let (next, actions) = state.on_event(event, &self.policy);
        self.connection = next;

        let mut effects = Vec::with_capacity(actions.len());
        for action in actions {
            match action {
                Action::Connect => effects.push(Effect::Connect),
                Action::Disconnect => {
                    // nothing is buffered across a disconnection
                    self.debouncer.cancel();
                    effects.push(Effect::Disconnect);
                }
                Action::StartReconnectTimer { delay } => self.retry_deadline = Some(now + delay),
                Action::CancelReconnect => self.retry_deadline = None,
                Action::EmitEvent(event) => effects.push(Effect::Notify(event)),
            }
        }
        effects
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new(Timing::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    fn connected_engine(t0: Instant) -> SyncEngine {
        let mut engine = SyncEngine::default();
        engine.enable(t0);
        engine.connect_succeeded(t0);
        assert!(engine.is_connected());
        engine
    }

    fn open(path: &str) -> LocalEvent {
        LocalEvent::ActiveDocumentChanged { path: path.into() }
    }

    fn cursor(path: &str, line: u32, character: u32) -> LocalEvent {
        LocalEvent::SelectionChanged {
            path: path.into(),
            line,
            character,
        }
    }

    fn sends(effects: &[Effect]) -> Vec<&Message> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    // ===========================================
    // Lifecycle Tests
    // ===========================================

    #[test]
    fn starts_disabled_and_disconnected() {
        let engine = SyncEngine::default();
        assert!(!engine.is_enabled());
        assert!(!engine.is_connected());
        assert_eq!(engine.status(), SyncStatus::Off);
        assert_eq!(engine.next_deadline(), None);
    }

    #[test]
    fn enable_requests_connect() {
        let mut engine = SyncEngine::default();
        assert_eq!(engine.enable(Instant::now()), vec![Effect::Connect]);
        assert_eq!(engine.status(), SyncStatus::Connecting);
    }

    #[test]
    fn enable_twice_is_noop() {
        let t0 = Instant::now();
        let mut engine = SyncEngine::default();
        engine.enable(t0);
        assert!(engine.enable(t0).is_empty());

        engine.connect_succeeded(t0);
        assert!(engine.enable(t0).is_empty());
        assert!(engine.is_connected());
    }

    #[test]
    fn connect_success_notifies() {
        let t0 = Instant::now();
        let mut engine = SyncEngine::default();
        engine.enable(t0);
        assert_eq!(
            engine.connect_succeeded(t0),
            vec![Effect::Notify(SyncEvent::Connected)]
        );
        assert_eq!(engine.status(), SyncStatus::On);
    }

    #[test]
    fn connect_failure_schedules_single_retry() {
        let t0 = Instant::now();
        let mut engine = SyncEngine::default();
        engine.enable(t0);
        let effects = engine.connect_failed(t0, "refused");

        assert!(!effects.contains(&Effect::Connect));
        assert_eq!(engine.retry_deadline(), Some(t0 + Duration::from_secs(5)));
        assert_eq!(engine.next_deadline(), Some(t0 + Duration::from_secs(5)));

        // nothing happens before the backoff elapses
        assert!(engine.poll_timers(t0 + 4999 * MS).is_empty());

        // exactly one attempt when it does
        let effects = engine.poll_timers(t0 + Duration::from_secs(5));
        assert_eq!(effects, vec![Effect::Connect]);
        assert_eq!(engine.retry_deadline(), None);
        assert!(engine.poll_timers(t0 + Duration::from_secs(6)).is_empty());

        // second failure schedules the next single attempt
        let t1 = t0 + Duration::from_secs(5);
        engine.connect_failed(t1, "refused");
        assert_eq!(engine.retry_deadline(), Some(t1 + Duration::from_secs(5)));
    }

    #[test]
    fn connection_loss_schedules_retry() {
        let t0 = Instant::now();
        let mut engine = connected_engine(t0);
        let effects = engine.connection_lost(t0, "reset by peer");

        assert!(effects.contains(&Effect::Disconnect));
        assert!(effects.contains(&Effect::Notify(SyncEvent::Disconnected {
            reason: "reset by peer".into()
        })));
        assert!(engine.is_enabled());
        assert!(!engine.is_connected());
        assert_eq!(engine.retry_deadline(), Some(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn disable_prevents_reconnect() {
        let t0 = Instant::now();
        let mut engine = SyncEngine::default();
        engine.enable(t0);
        engine.connect_failed(t0, "refused");
        assert!(engine.retry_deadline().is_some());

        engine.disable(t0 + MS);
        assert_eq!(engine.retry_deadline(), None);
        assert_eq!(engine.next_deadline(), None);
        assert!(engine.poll_timers(t0 + Duration::from_secs(60)).is_empty());
        assert_eq!(engine.status(), SyncStatus::Off);
    }

    #[test]
    fn disable_clears_all_deadlines() {
        let t0 = Instant::now();
        let mut engine = connected_engine(t0);
        engine.inbound(t0, Message::open_file("/a"), None);
        engine.local_event(t0, cursor("/b", 1, 1)).unwrap();
        // cursor was suppressed; let the window pass and queue one
        engine.local_event(t0 + 200 * MS, cursor("/b", 2, 2)).unwrap();
        assert!(engine.pending_cursor().is_some());

        let effects = engine.disable(t0 + 200 * MS);
        assert!(effects.contains(&Effect::Disconnect));
        assert_eq!(engine.pending_cursor(), None);
        assert_eq!(engine.suppressed_until(), None);
        assert_eq!(engine.next_deadline(), None);
    }

    #[test]
    fn disable_when_disabled_is_noop() {
        let mut engine = SyncEngine::default();
        assert!(engine.disable(Instant::now()).is_empty());
    }

    #[test]
    fn toggle_flips() {
        let t0 = Instant::now();
        let mut engine = SyncEngine::default();
        assert_eq!(engine.toggle(t0), vec![Effect::Connect]);
        assert!(engine.is_enabled());
        assert_eq!(engine.toggle(t0), vec![Effect::Disconnect]);
        assert!(!engine.is_enabled());
    }

    #[test]
    fn stale_connect_result_after_disable_is_ignored() {
        let t0 = Instant::now();
        let mut engine = SyncEngine::default();
        engine.enable(t0);
        engine.disable(t0);
        assert!(engine.connect_succeeded(t0).is_empty());
        assert!(!engine.is_connected());
    }

    // ===========================================
    // Outbound Tests
    // ===========================================

    #[test]
    fn open_and_close_sent_immediately() {
        let t0 = Instant::now();
        let mut engine = connected_engine(t0);

        let effects = engine.local_event(t0, open("/a.txt")).unwrap();
        assert_eq!(effects, vec![Effect::Send(Message::open_file("/a.txt"))]);

        let effects = engine
            .local_event(t0, LocalEvent::DocumentClosed { path: "/a.txt".into() })
            .unwrap();
        assert_eq!(effects, vec![Effect::Send(Message::close_file("/a.txt"))]);
    }

    #[test]
    fn events_dropped_without_connection() {
        let t0 = Instant::now();
        let mut engine = SyncEngine::default();
        assert!(engine.local_event(t0, open("/a.txt")).unwrap().is_empty());

        engine.enable(t0);
        assert!(engine.local_event(t0, open("/a.txt")).unwrap().is_empty());
        assert!(engine.local_event(t0, cursor("/a.txt", 1, 1)).unwrap().is_empty());
        assert_eq!(engine.pending_cursor(), None);
    }

    #[test]
    fn relative_path_is_rejected() {
        let t0 = Instant::now();
        let mut engine = connected_engine(t0);
        assert!(matches!(
            engine.local_event(t0, open("notes.md")),
            Err(CodecError::InvalidPath { .. })
        ));
    }

    #[test]
    fn cursor_burst_sends_last_position_once() {
        let t0 = Instant::now();
        let mut engine = connected_engine(t0);

        let mut sent = Vec::new();
        for i in 0..5u32 {
            let now = t0 + i * 10 * MS;
            sent.extend(engine.local_event(now, cursor("/a.txt", i, i)).unwrap());
            sent.extend(engine.poll_timers(now));
        }
        assert!(sends(&sent).is_empty());

        // last event at t0+40ms; window closes at t0+90ms
        assert_eq!(engine.next_deadline(), Some(t0 + 90 * MS));
        sent.extend(engine.poll_timers(t0 + 90 * MS));
        sent.extend(engine.poll_timers(t0 + 500 * MS));
        assert_eq!(sends(&sent), vec![&Message::cursor_move("/a.txt", 4, 4)]);
    }

    #[test]
    fn pending_cursor_dropped_on_connection_loss() {
        let t0 = Instant::now();
        let mut engine = connected_engine(t0);
        engine.local_event(t0, cursor("/a.txt", 3, 3)).unwrap();
        engine.connection_lost(t0 + 10 * MS, "eof");

        assert_eq!(engine.pending_cursor(), None);
        assert!(sends(&engine.poll_timers(t0 + 100 * MS)).is_empty());
    }

    // ===========================================
    // Inbound / Suppression Tests
    // ===========================================

    #[test]
    fn inbound_open_is_applied_and_echo_suppressed() {
        let t0 = Instant::now();
        let mut engine = connected_engine(t0);

        let frame = Message::open_file("/tmp/x.txt").to_frame().unwrap();
        let effects = engine.inbound_frame(t0, &frame, None).unwrap();
        assert_eq!(effects, vec![Effect::Apply(Message::open_file("/tmp/x.txt"))]);
        assert_eq!(engine.suppressed_until(), Some(t0 + 100 * MS));

        // the editor reports the programmatic open as a local event
        let echo = engine.local_event(t0 + 5 * MS, open("/tmp/x.txt")).unwrap();
        assert!(echo.is_empty());

        // after the window, local events flow again
        let later = engine.local_event(t0 + 100 * MS, open("/tmp/x.txt")).unwrap();
        assert_eq!(later, vec![Effect::Send(Message::open_file("/tmp/x.txt"))]);
    }

    #[test]
    fn slow_apply_extends_window_from_completion() {
        let t0 = Instant::now();
        let mut engine = connected_engine(t0);
        let message = Message::open_file("/tmp/x.txt");
        engine.inbound(t0, message.clone(), None);

        // the editor needed 150ms to open the file
        let done = t0 + 150 * MS;
        engine.applied(done, &message);
        assert_eq!(engine.suppressed_until(), Some(done + 100 * MS));
        assert!(engine.local_event(done + 5 * MS, open("/tmp/x.txt")).unwrap().is_empty());

        // a fast apply never shortens the window armed on receipt
        let cursor_move = Message::cursor_move("/tmp/x.txt", 1, 1);
        engine.applied(done + 10 * MS, &cursor_move);
        assert_eq!(engine.suppressed_until(), Some(done + 100 * MS));
    }

    #[test]
    fn inbound_cursor_uses_short_window() {
        let t0 = Instant::now();
        let mut engine = connected_engine(t0);
        let effects = engine.inbound(t0, Message::cursor_move("/a.txt", 7, 2), Some("/a.txt"));

        assert_eq!(effects, vec![Effect::Apply(Message::cursor_move("/a.txt", 7, 2))]);
        assert_eq!(engine.suppressed_until(), Some(t0 + 50 * MS));
        assert!(engine
            .local_event(t0 + 10 * MS, cursor("/a.txt", 7, 2))
            .unwrap()
            .is_empty());
        assert_eq!(engine.pending_cursor(), None);
    }

    #[test]
    fn inbound_cursor_for_background_document_ignored() {
        let t0 = Instant::now();
        let mut engine = connected_engine(t0);

        assert!(engine
            .inbound(t0, Message::cursor_move("/a.txt", 1, 1), Some("/b.txt"))
            .is_empty());
        assert!(engine
            .inbound(t0, Message::cursor_move("/a.txt", 1, 1), None)
            .is_empty());
        assert_eq!(engine.suppressed_until(), None);
    }

    #[test]
    fn malformed_frame_leaves_state_untouched() {
        let t0 = Instant::now();
        let mut engine = connected_engine(t0);
        engine.local_event(t0, cursor("/a.txt", 1, 1)).unwrap();
        let before = format!("{engine:?}");

        let frames: [&[u8]; 4] = [b"{not json", b"", br#"{"type":"zoom"}"#, &[0xc3, 0x28]];
        for frame in frames {
            assert!(engine.inbound_frame(t0, frame, Some("/a.txt")).is_err());
        }

        assert_eq!(format!("{engine:?}"), before);
        assert!(engine.is_connected());
    }

    #[test]
    fn inbound_ignored_when_not_connected() {
        let t0 = Instant::now();
        let mut engine = SyncEngine::default();
        engine.enable(t0);
        assert!(engine.inbound(t0, Message::open_file("/a"), None).is_empty());
        assert_eq!(engine.suppressed_until(), None);
    }

    #[test]
    fn custom_timing_is_respected() {
        let t0 = Instant::now();
        let timing = Timing {
            reconnect_delay: Duration::from_secs(1),
            debounce: 20 * MS,
            open_close_suppression: 300 * MS,
            cursor_suppression: 30 * MS,
        };
        let mut engine = SyncEngine::new(timing);
        engine.enable(t0);
        engine.connect_failed(t0, "refused");
        assert_eq!(engine.retry_deadline(), Some(t0 + Duration::from_secs(1)));

        engine.poll_timers(t0 + Duration::from_secs(1));
        engine.connect_succeeded(t0 + Duration::from_secs(1));
        let t1 = t0 + Duration::from_secs(1);

        engine.inbound(t1, Message::close_file("/a"), None);
        assert_eq!(engine.suppressed_until(), Some(t1 + 300 * MS));

        engine.local_event(t1 + 300 * MS, cursor("/a", 0, 0)).unwrap();
        assert_eq!(engine.next_deadline(), Some(t1 + 320 * MS));
    }
}
