//! Line-oriented terminal editor.
//!
//! Stands in for a real editor host: typed commands become local editor
//! events, and remote changes are applied to an in-memory view and printed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use vsync_client::{ApplyError, EditorAdapter, LocalEvent};

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCommand {
    /// `open <path>`
    Open(String),
    /// `close <path>`
    Close(String),
    /// `cursor <path> <line> <col>`
    Cursor {
        /// Document path.
        path: String,
        /// Zero-based line.
        line: u32,
        /// Zero-based column.
        character: u32,
    },
    /// `toggle`
    Toggle,
    /// `status`
    Status,
    /// `show`
    Show,
    /// `help`
    Help,
    /// `quit`
    Quit,
}

impl TerminalCommand {
    /// The local editor event this command represents, if any.
    pub fn local_event(&self) -> Option<LocalEvent> {
        match self {
            TerminalCommand::Open(path) => Some(LocalEvent::ActiveDocumentChanged {
                path: path.clone(),
            }),
            TerminalCommand::Close(path) => Some(LocalEvent::DocumentClosed { path: path.clone() }),
            TerminalCommand::Cursor {
                path,
                line,
                character,
            } => Some(LocalEvent::SelectionChanged {
                path: path.clone(),
                line: *line,
                character: *character,
            }),
            _ => None,
        }
    }
}

/// Usage text for the interactive prompt.
pub const HELP: &str = "\
commands:
  open <path>                 focus a document
  close <path>                close a document
  cursor <path> <line> <col>  move the cursor (zero-based)
  toggle                      turn sync on or off
  status                      print sync status
  show                        print the local editor state
  quit                        exit";

/// Parse one input line. Blank lines yield `Ok(None)`.
///
/// Paths may contain spaces for `open` and `close`; `cursor` takes the last
/// two words as coordinates.
pub fn parse_command(line: &str) -> Result<Option<TerminalCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb {
        "open" | "close" => {
            if rest.is_empty() {
                return Err(format!("usage: {verb} <path>"));
            }
            if verb == "open" {
                TerminalCommand::Open(rest.to_string())
            } else {
                TerminalCommand::Close(rest.to_string())
            }
        }
        "cursor" => {
            let mut words = rest.rsplitn(3, char::is_whitespace);
            let (Some(col), Some(line_no), Some(path)) = (words.next(), words.next(), words.next())
            else {
                return Err("usage: cursor <path> <line> <col>".to_string());
            };
            let line_no = line_no
                .parse()
                .map_err(|_| format!("invalid line number: {line_no}"))?;
            let character = col
                .parse()
                .map_err(|_| format!("invalid column: {col}"))?;
            TerminalCommand::Cursor {
                path: path.trim().to_string(),
                line: line_no,
                character,
            }
        }
        "toggle" => TerminalCommand::Toggle,
        "status" => TerminalCommand::Status,
        "show" => TerminalCommand::Show,
        "help" | "?" => TerminalCommand::Help,
        "quit" | "exit" => TerminalCommand::Quit,
        other => return Err(format!("unknown command: {other} (try `help`)")),
    };
    Ok(Some(command))
}

#[derive(Debug, Default)]
struct View {
    open: Vec<String>,
    active: Option<String>,
    cursor: Option<(u32, u32)>,
}

impl View {
    fn open(&mut self, path: &str) {
        if !self.open.iter().any(|p| p == path) {
            self.open.push(path.to_string());
        }
        if self.active.as_deref() != Some(path) {
            self.cursor = None;
        }
        self.active = Some(path.to_string());
    }

    fn close(&mut self, path: &str) {
        self.open.retain(|p| p != path);
        if self.active.as_deref() == Some(path) {
            self.active = None;
            self.cursor = None;
        }
    }

    fn set_cursor(&mut self, path: &str, line: u32, character: u32) {
        self.open(path);
        self.cursor = Some((line, character));
    }
}

/// In-memory editor driven from the terminal.
#[derive(Debug, Clone, Default)]
pub struct TerminalEditor {
    view: Arc<Mutex<View>>,
}

impl TerminalEditor {
    /// Create an empty editor.
    pub fn new() -> Self {
        Self::default()
    }

    fn view(&self) -> MutexGuard<'_, View> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Update the view for a command typed by the user.
    pub fn apply_local(&self, command: &TerminalCommand) {
        let mut view = self.view();
        match command {
            TerminalCommand::Open(path) => view.open(path),
            TerminalCommand::Close(path) => view.close(path),
            TerminalCommand::Cursor {
                path,
                line,
                character,
            } => view.set_cursor(path, *line, *character),
            _ => {}
        }
    }

    /// Human-readable description of the view.
    pub fn describe(&self) -> String {
        let view = self.view();
        let open = if view.open.is_empty() {
            "(none)".to_string()
        } else {
            view.open.join(", ")
        };
        let active = match (&view.active, view.cursor) {
            (Some(path), Some((line, character))) => format!("{path} @ {line}:{character}"),
            (Some(path), None) => path.clone(),
            (None, _) => "(none)".to_string(),
        };
        format!("open: {open}\nactive: {active}")
    }
}

#[async_trait]
impl EditorAdapter for TerminalEditor {
    async fn open_document(&self, path: &str) -> Result<(), ApplyError> {
        self.view().open(path);
        println!("<< open {path}");
        Ok(())
    }

    async fn close_document(&self, path: &str) -> Result<(), ApplyError> {
        self.view().close(path);
        println!("<< close {path}");
        Ok(())
    }

    async fn set_cursor(&self, path: &str, line: u32, character: u32) -> Result<(), ApplyError> {
        self.view().set_cursor(path, line, character);
        println!("<< cursor {path} {line}:{character}");
        Ok(())
    }

    fn active_document(&self) -> Option<String> {
        self.view().active.clone()
    }
}
