//! Stream framing for vsync.
//!
//! Frames are newline-delimited. A stream read may carry several frames or
//! only part of one; [`FrameBuffer`] accumulates raw bytes and yields only
//! complete frames so no partial payload ever reaches the decoder.

use crate::CodecError;

/// Byte terminating every frame.
pub const FRAME_DELIMITER: u8 = b'\n';

/// Default upper bound for a single frame (64 KiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Reassembles newline-delimited frames from arbitrary stream chunks.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    /// Bytes at the front of `buf` already known to contain no delimiter.
    scanned: usize,
    max_frame_size: usize,
}

impl FrameBuffer {
    /// Create a buffer that rejects frames larger than `max_frame_size` bytes
    /// (delimiter excluded).
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buf: Vec::new(),
            scanned: 0,
            max_frame_size,
        }
    }

    /// Append bytes read from the stream.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete frame, delimiter included.
    ///
    /// Blank lines carry no frame and are skipped. Returns `Ok(None)` when
    /// more bytes are needed, and [`CodecError::FrameTooLarge`] once the
    /// current frame exceeds the limit; the stream is unusable after that.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, CodecError> {
        loop {
            let found = self.buf[self.scanned..]
                .iter()
                .position(|b| *b == FRAME_DELIMITER)
                .map(|offset| self.scanned + offset);

            let Some(end) = found else {
                self.scanned = self.buf.len();
                if self.buf.len() > self.max_frame_size {
                    return Err(CodecError::FrameTooLarge {
                        size: self.buf.len(),
                        limit: self.max_frame_size,
                    });
                }
                return Ok(None);
            };

            if end > self.max_frame_size {
                return Err(CodecError::FrameTooLarge {
                    size: end,
                    limit: self.max_frame_size,
                });
            }

            let frame: Vec<u8> = self.buf.drain(..=end).collect();
            self.scanned = 0;

            if frame.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Some(frame));
        }
    }

    /// Number of buffered bytes not yet returned as a frame.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Whether no partial frame is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}
