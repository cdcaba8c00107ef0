//! Protocol messages for vsync.
//!
//! A [`Message`] describes one editor view change. Only file identity and
//! cursor coordinates travel over the wire, never document text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::frame::FRAME_DELIMITER;
use crate::CodecError;

/// All synchronized editor events.
///
/// Serialized as an internally tagged JSON object; the cursor column is
/// carried in the `character` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    /// A document became the active (focused) document.
    OpenFile {
        /// Absolute path of the document.
        path: String,
    },
    /// All views of a document were closed.
    CloseFile {
        /// Absolute path of the document.
        path: String,
    },
    /// The cursor moved inside the active document.
    CursorMove {
        /// Absolute path of the document.
        path: String,
        /// Zero-based line.
        line: u32,
        /// Zero-based column.
        #[serde(rename = "character")]
        column: u32,
    },
}

/// Discriminant of a [`Message`], as it appears in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// `openFile`
    OpenFile,
    /// `closeFile`
    CloseFile,
    /// `cursorMove`
    CursorMove,
}

impl MessageKind {
    /// The wire tag for this kind.
    pub fn tag(self) -> &'static str {
        match self {
            MessageKind::OpenFile => "openFile",
            MessageKind::CloseFile => "closeFile",
            MessageKind::CursorMove => "cursorMove",
        }
    }

    /// Look up a kind by its wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "openFile" => Some(MessageKind::OpenFile),
            "closeFile" => Some(MessageKind::CloseFile),
            "cursorMove" => Some(MessageKind::CursorMove),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl Message {
    /// Create an `openFile` message.
    pub fn open_file(path: impl Into<String>) -> Self {
        Message::OpenFile { path: path.into() }
    }

    /// Create a `closeFile` message.
    pub fn close_file(path: impl Into<String>) -> Self {
        Message::CloseFile { path: path.into() }
    }

    /// Create a `cursorMove` message.
    pub fn cursor_move(path: impl Into<String>, line: u32, column: u32) -> Self {
        Message::CursorMove {
            path: path.into(),
            line,
            column,
        }
    }

    /// The message discriminant.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::OpenFile { .. } => MessageKind::OpenFile,
            Message::CloseFile { .. } => MessageKind::CloseFile,
            Message::CursorMove { .. } => MessageKind::CursorMove,
        }
    }

    /// The document path this message refers to.
    pub fn path(&self) -> &str {
        match self {
            Message::OpenFile { path }
            | Message::CloseFile { path }
            | Message::CursorMove { path, .. } => path,
        }
    }

    /// Check the path invariant (non-empty and absolute).
    pub fn validate(&self) -> Result<(), CodecError> {
        let path = self.path();
        if is_absolute_path(path) {
            Ok(())
        } else {
            Err(CodecError::InvalidPath {
                path: path.to_string(),
            })
        }
    }

    /// Serialize to the JSON payload (no delimiter).
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        self.validate()?;
        serde_json::to_vec(self).map_err(CodecError::Serialization)
    }

    /// Serialize to a complete wire frame (payload plus delimiter).
    pub fn to_frame(&self) -> Result<Vec<u8>, CodecError> {
        let mut frame = self.to_bytes()?;
        frame.push(FRAME_DELIMITER);
        Ok(frame)
    }

    /// Deserialize one frame.
    ///
    /// Surrounding whitespace (including the frame delimiter) is ignored, as
    /// are unknown fields. Unknown `type` values yield
    /// [`CodecError::UnknownType`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let text = std::str::from_utf8(bytes)?.trim();
        if text.is_empty() {
            return Err(CodecError::Empty);
        }

        let value: Value =
            serde_json::from_str(text).map_err(|e| CodecError::Malformed(e.to_string()))?;
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| CodecError::Malformed("missing \"type\" field".into()))?;
        if MessageKind::from_tag(tag).is_none() {
            return Err(CodecError::UnknownType(tag.to_string()));
        }

        let message: Message =
            serde_json::from_value(value).map_err(|e| CodecError::Malformed(e.to_string()))?;
        message.validate()?;
        Ok(message)
    }
}

/// Encode a message as a complete wire frame.
pub fn encode(message: &Message) -> Result<Vec<u8>, CodecError> {
    message.to_frame()
}

/// Decode exactly one frame into a message.
pub fn decode(frame: &[u8]) -> Result<Message, CodecError> {
    Message::from_bytes(frame)
}

/// Whether `path` is a non-empty absolute path on any supported host.
///
/// Peers may run on different operating systems, so both POSIX (`/x`) and
/// Windows (`C:\x`, `C:/x`, `\\server\share`) forms are accepted regardless
/// of the local platform.
pub fn is_absolute_path(path: &str) -> bool {
    if path.starts_with('/') || path.starts_with("\\\\") {
        return true;
    }
    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===========================================
    // Wire Format Tests
    // ===========================================

    #[test]
    fn open_file_wire_format() {
        let bytes = Message::open_file("/tmp/x.txt").to_bytes().unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"type":"openFile","path":"/tmp/x.txt"}"#
        );
    }

    #[test]
    fn cursor_move_uses_character_field() {
        let bytes = Message::cursor_move("/src/main.rs", 12, 4)
            .to_bytes()
            .unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"type":"cursorMove","path":"/src/main.rs","line":12,"character":4}"#
        );
    }

    #[test]
    fn frame_ends_with_delimiter() {
        let frame = Message::close_file("/a").to_frame().unwrap();
        assert_eq!(frame.last(), Some(&b'\n'));
        assert_eq!(frame.iter().filter(|b| **b == b'\n').count(), 1);
    }

    #[test]
    fn decode_inverts_encode() {
        let messages = [
            Message::open_file("/home/me/notes.md"),
            Message::close_file("C:\\Users\\me\\notes.md"),
            Message::cursor_move("/tmp/line\nbreak.txt", u32::MAX, 0),
        ];
        for message in messages {
            let frame = message.to_frame().unwrap();
            assert_eq!(Message::from_bytes(&frame).unwrap(), message);
        }
    }

    #[test]
    fn path_with_newline_stays_in_one_frame() {
        let frame = Message::open_file("/tmp/a\nb").to_frame().unwrap();
        // serde_json escapes control characters, so only the delimiter is raw
        assert_eq!(frame.iter().filter(|b| **b == b'\n').count(), 1);
    }

    // ===========================================
    // Forward Compatibility Tests
    // ===========================================

    #[test]
    fn free_functions_match_methods() {
        let msg = Message::cursor_move("/a.rs", 1, 2);
        let frame = encode(&msg).unwrap();
        assert_eq!(frame, msg.to_frame().unwrap());
        assert_eq!(decode(&frame).unwrap(), msg);
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let raw = br#"{"type":"openFile","path":"/a.txt","origin":"nvim","v":2}"#;
        assert_eq!(
            Message::from_bytes(raw).unwrap(),
            Message::open_file("/a.txt")
        );
    }

    #[test]
    fn decode_rejects_unknown_type() {
        let raw = br#"{"type":"scroll","path":"/a.txt","top":10}"#;
        let err = Message::from_bytes(raw).unwrap_err();
        assert!(matches!(err, CodecError::UnknownType(ref t) if t == "scroll"));
    }

    // ===========================================
    // Malformed Input Tests
    // ===========================================

    #[test]
    fn decode_empty_frame() {
        assert!(matches!(Message::from_bytes(b""), Err(CodecError::Empty)));
        assert!(matches!(Message::from_bytes(b" \r\n"), Err(CodecError::Empty)));
    }

    #[test]
    fn decode_garbage() {
        assert!(matches!(
            Message::from_bytes(b"not json"),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(
            Message::from_bytes(b"[1,2,3]"),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn decode_invalid_utf8() {
        assert!(matches!(
            Message::from_bytes(&[0xff, 0xfe, 0x00]),
            Err(CodecError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn decode_missing_fields() {
        let raw = br#"{"type":"cursorMove","path":"/a.txt","line":1}"#;
        assert!(matches!(
            Message::from_bytes(raw),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn decode_rejects_negative_line() {
        let raw = br#"{"type":"cursorMove","path":"/a.txt","line":-1,"character":0}"#;
        assert!(matches!(
            Message::from_bytes(raw),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn decode_rejects_relative_path() {
        let raw = br#"{"type":"openFile","path":"relative/a.txt"}"#;
        assert!(matches!(
            Message::from_bytes(raw),
            Err(CodecError::InvalidPath { .. })
        ));
        let raw = br#"{"type":"openFile","path":""}"#;
        assert!(matches!(
            Message::from_bytes(raw),
            Err(CodecError::InvalidPath { .. })
        ));
    }

    #[test]
    fn encode_rejects_invalid_path() {
        assert!(matches!(
            Message::open_file("").to_bytes(),
            Err(CodecError::InvalidPath { .. })
        ));
    }

    // ===========================================
    // Helper Tests
    // ===========================================

    #[test]
    fn absolute_path_forms() {
        assert!(is_absolute_path("/"));
        assert!(is_absolute_path("/tmp/x.txt"));
        assert!(is_absolute_path("C:\\work\\x.txt"));
        assert!(is_absolute_path("d:/work/x.txt"));
        assert!(is_absolute_path("\\\\server\\share\\x.txt"));

        assert!(!is_absolute_path(""));
        assert!(!is_absolute_path("x.txt"));
        assert!(!is_absolute_path("./x.txt"));
        assert!(!is_absolute_path("C:"));
        assert!(!is_absolute_path("C:x.txt"));
    }

    #[test]
    fn kind_and_path_accessors() {
        let msg = Message::cursor_move("/a", 1, 2);
        assert_eq!(msg.kind(), MessageKind::CursorMove);
        assert_eq!(msg.kind().to_string(), "cursorMove");
        assert_eq!(msg.path(), "/a");
        assert_eq!(MessageKind::from_tag("closeFile"), Some(MessageKind::CloseFile));
        assert_eq!(MessageKind::from_tag("CloseFile"), None);
    }
}
