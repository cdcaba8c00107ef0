//! # sync-types
//!
//! Wire format types for vsync.
//!
//! This crate provides the foundational types used across all vsync crates:
//! - [`Message`] - the three synchronized editor events (open, close, cursor)
//! - [`FrameBuffer`] - newline-delimited frame reassembly for stream transports
//! - [`CodecError`] - decode/encode failures
//!
//! ## Wire format
//!
//! Each frame is one UTF-8 JSON object terminated by `\n`:
//!
//! ```text
//! {"type":"openFile","path":"/abs/path"}
//! {"type":"closeFile","path":"/abs/path"}
//! {"type":"cursorMove","path":"/abs/path","line":3,"character":14}
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod frame;
mod messages;

pub use error::CodecError;
pub use frame::{FrameBuffer, DEFAULT_MAX_FRAME_SIZE, FRAME_DELIMITER};
pub use messages::{decode, encode, is_absolute_path, Message, MessageKind};
