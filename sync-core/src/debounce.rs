//! Cursor movement debouncing.
//!
//! Cursor events arrive far faster than peers need them. A
//! [`CursorDebouncer`] holds at most one pending position with a single
//! deadline; every new position replaces the pending one and pushes the
//! deadline out, so a burst yields only its final position.

use std::time::{Duration, Instant};
use vsync_types::Message;

/// Default debounce window for cursor moves.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pending {
    message: Message,
    deadline: Instant,
}

/// Coalescing buffer with a single deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorDebouncer {
    window: Duration,
    pending: Option<Pending>,
}

impl CursorDebouncer {
    /// Create a debouncer with the given quiet window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Record a new cursor position, superseding any pending one.
    ///
    /// Returns the new deadline.
    pub fn push(&mut self, now: Instant, message: Message) -> Instant {
        let deadline = now + self.window;
        self.pending = Some(Pending { message, deadline });
        deadline
    }

    /// Take the pending message if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<Message> {
        match &self.pending {
            Some(pending) if pending.deadline <= now => {
                self.pending.take().map(|p| p.message)
            }
            _ => None,
        }
    }

    /// Deadline of the pending message.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// The pending message, if any.
    pub fn pending(&self) -> Option<&Message> {
        self.pending.as_ref().map(|p| &p.message)
    }

    /// Drop the pending message.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

impl Default for CursorDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn nothing_before_deadline() {
        let t0 = Instant::now();
        let mut debouncer = CursorDebouncer::default();
        let deadline = debouncer.push(t0, Message::cursor_move("/a", 1, 1));

        assert_eq!(deadline, t0 + 50 * MS);
        assert_eq!(debouncer.poll(t0 + 49 * MS), None);
        assert!(debouncer.pending().is_some());
    }

    #[test]
    fn fires_at_deadline_once() {
        let t0 = Instant::now();
        let mut debouncer = CursorDebouncer::default();
        debouncer.push(t0, Message::cursor_move("/a", 1, 1));

        assert_eq!(
            debouncer.poll(t0 + 50 * MS),
            Some(Message::cursor_move("/a", 1, 1))
        );
        assert_eq!(debouncer.poll(t0 + 100 * MS), None);
        assert_eq!(debouncer.deadline(), None);
    }

    #[test]
    fn burst_keeps_last_position() {
        let t0 = Instant::now();
        let mut debouncer = CursorDebouncer::default();
        for i in 0..10u32 {
            debouncer.push(t0 + i * 4 * MS, Message::cursor_move("/a", i, i));
        }

        // last push at t0+36ms, so the window ends at t0+86ms
        assert_eq!(debouncer.poll(t0 + 60 * MS), None);
        assert_eq!(
            debouncer.poll(t0 + 86 * MS),
            Some(Message::cursor_move("/a", 9, 9))
        );
    }

    #[test]
    fn cancel_drops_pending() {
        let t0 = Instant::now();
        let mut debouncer = CursorDebouncer::default();
        debouncer.push(t0, Message::cursor_move("/a", 1, 1));
        debouncer.cancel();
        assert_eq!(debouncer.poll(t0 + 50 * MS), None);
    }
}
