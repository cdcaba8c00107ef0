//! Echo suppression.
//!
//! Applying a remote change makes most editor hosts report the change back as
//! if the user did it. While a [`SuppressionWindow`] is active, such local
//! events are dropped instead of being re-broadcast.

use std::time::{Duration, Instant};

/// A "suppressed until T" deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuppressionWindow {
    until: Option<Instant>,
}

impl SuppressionWindow {
    /// Create an inactive window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress local events until at least `now + window`.
    ///
    /// Never shortens a window that is already further out.
    pub fn extend(&mut self, now: Instant, window: Duration) {
        let candidate = now + window;
        self.until = Some(match self.until {
            Some(existing) if existing > candidate => existing,
            _ => candidate,
        });
    }

    /// Whether local events observed at `now` must be dropped.
    pub fn is_active(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }

    /// The current deadline, if any.
    pub fn until(&self) -> Option<Instant> {
        self.until
    }

    /// Deactivate the window.
    pub fn clear(&mut self) {
        self.until = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn inactive_by_default() {
        let window = SuppressionWindow::new();
        assert!(!window.is_active(Instant::now()));
        assert_eq!(window.until(), None);
    }

    #[test]
    fn active_until_deadline() {
        let t0 = Instant::now();
        let mut window = SuppressionWindow::new();
        window.extend(t0, 100 * MS);

        assert!(window.is_active(t0));
        assert!(window.is_active(t0 + 99 * MS));
        assert!(!window.is_active(t0 + 100 * MS));
        assert!(!window.is_active(t0 + 500 * MS));
    }

    #[test]
    fn shorter_window_does_not_truncate() {
        let t0 = Instant::now();
        let mut window = SuppressionWindow::new();
        window.extend(t0, 100 * MS);
        window.extend(t0 + 10 * MS, 50 * MS);

        assert_eq!(window.until(), Some(t0 + 100 * MS));
        assert!(window.is_active(t0 + 80 * MS));
    }

    #[test]
    fn later_window_extends() {
        let t0 = Instant::now();
        let mut window = SuppressionWindow::new();
        window.extend(t0, 50 * MS);
        window.extend(t0 + 40 * MS, 50 * MS);

        assert_eq!(window.until(), Some(t0 + 90 * MS));
    }

    #[test]
    fn clear_deactivates() {
        let t0 = Instant::now();
        let mut window = SuppressionWindow::new();
        window.extend(t0, 100 * MS);
        window.clear();
        assert!(!window.is_active(t0));
    }
}
