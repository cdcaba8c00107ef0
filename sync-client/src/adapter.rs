//! Editor host integration.
//!
//! The client never touches an editor directly. It applies remote changes
//! through an [`EditorAdapter`] and learns about local changes through
//! [`SyncHandle::local_event`](crate::SyncHandle::local_event).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use vsync_core::LocalEvent;
use vsync_types::Message;

use crate::client::SyncHandle;

/// Errors reported by an editor adapter.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The document does not exist or cannot be opened.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The editor refused the change.
    #[error("editor rejected change: {0}")]
    Rejected(String),
}

/// Operations the client needs from the local editor.
///
/// Applying a change usually makes the editor report it back as a local
/// event; the client suppresses that echo.
#[async_trait]
pub trait EditorAdapter: Send + Sync {
    /// Open `path` and make it the active document.
    async fn open_document(&self, path: &str) -> Result<(), ApplyError>;

    /// Close every view of `path`.
    async fn close_document(&self, path: &str) -> Result<(), ApplyError>;

    /// Move the cursor of the active document to (`line`, `character`) and
    /// scroll it into view.
    async fn set_cursor(&self, path: &str, line: u32, character: u32) -> Result<(), ApplyError>;

    /// Path of the focused document, if any.
    fn active_document(&self) -> Option<String>;
}

/// Apply one remote message through `adapter`.
pub(crate) async fn apply<A: EditorAdapter + ?Sized>(
    adapter: &A,
    message: &Message,
) -> Result<(), ApplyError> {
    match message {
        Message::OpenFile { path } => adapter.open_document(path).await,
        Message::CloseFile { path } => adapter.close_document(path).await,
        Message::CursorMove { path, line, column } => {
            adapter.set_cursor(path, *line, *column).await
        }
    }
}

/// In-memory editor that records applied changes.
///
/// With [`RecordingAdapter::echo_to`] it reports every applied change back
/// as a local event, like a real editor host does.
#[derive(Debug, Clone, Default)]
pub struct RecordingAdapter {
    inner: Arc<Mutex<RecordingInner>>,
}

#[derive(Debug, Default)]
struct RecordingInner {
    applied: Vec<Message>,
    active: Option<String>,
    open: Vec<String>,
    missing: Vec<String>,
    echo: Option<SyncHandle>,
    delay: Option<Duration>,
}

impl RecordingAdapter {
    /// Create an empty editor.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, RecordingInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Report applied changes back to `handle` as local events.
    pub fn echo_to(&self, handle: SyncHandle) {
        self.inner().echo = Some(handle);
    }

    /// Make every apply take `delay`, like an editor loading a large file.
    pub fn set_apply_delay(&self, delay: Duration) {
        self.inner().delay = Some(delay);
    }

    /// Make `open_document(path)` fail with [`ApplyError::NotFound`].
    pub fn mark_missing(&self, path: &str) {
        self.inner().missing.push(path.to_string());
    }

    /// Focus `path` without applying anything, as if the user did it.
    pub fn set_active(&self, path: Option<&str>) {
        self.inner().active = path.map(str::to_string);
    }

    /// Every change applied so far, in order.
    pub fn applied(&self) -> Vec<Message> {
        self.inner().applied.clone()
    }

    /// Documents currently open.
    pub fn open_documents(&self) -> Vec<String> {
        self.inner().open.clone()
    }

    async fn record(&self, message: Message, echo: LocalEvent) {
        let delay = self.inner().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let handle = {
            let mut inner = self.inner();
            inner.applied.push(message);
            inner.echo.clone()
        };
        if let Some(handle) = handle {
            // the client may already be stopped
            let _ = handle.local_event(echo);
        }
    }
}

#[async_trait]
impl EditorAdapter for RecordingAdapter {
    async fn open_document(&self, path: &str) -> Result<(), ApplyError> {
        {
            let mut inner = self.inner();
            if inner.missing.iter().any(|p| p == path) {
                return Err(ApplyError::NotFound(path.to_string()));
            }
            if !inner.open.iter().any(|p| p == path) {
                inner.open.push(path.to_string());
            }
            inner.active = Some(path.to_string());
        }
        self.record(
            Message::open_file(path),
            LocalEvent::ActiveDocumentChanged { path: path.into() },
        )
        .await;
        Ok(())
    }

    async fn close_document(&self, path: &str) -> Result<(), ApplyError> {
        {
            let mut inner = self.inner();
            inner.open.retain(|p| p != path);
            if inner.active.as_deref() == Some(path) {
                inner.active = None;
            }
        }
        self.record(
            Message::close_file(path),
            LocalEvent::DocumentClosed { path: path.into() },
        )
        .await;
        Ok(())
    }

    async fn set_cursor(&self, path: &str, line: u32, character: u32) -> Result<(), ApplyError> {
        self.record(
            Message::cursor_move(path, line, character),
            LocalEvent::SelectionChanged {
                path: path.into(),
                line,
                character,
            },
        )
        .await;
        Ok(())
    }

    fn active_document(&self) -> Option<String> {
        self.inner().active.clone()
    }
}
