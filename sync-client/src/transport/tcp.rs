//! TCP transport.
//!
//! Reads and writes are split so a reader task can block in `recv()` while
//! the client sends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::debug;
use vsync_types::{FrameBuffer, DEFAULT_MAX_FRAME_SIZE};

use super::{Transport, TransportError};

/// Default limit for establishing a TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug)]
struct FramedReader {
    half: OwnedReadHalf,
    frames: FrameBuffer,
}

/// Newline-framed TCP connection to a relay.
#[derive(Debug)]
pub struct TcpTransport {
    reader: Mutex<Option<FramedReader>>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    connected: AtomicBool,
    max_frame_size: usize,
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Create a disconnected transport that rejects frames larger than
    /// `max_frame_size`.
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            reader: Mutex::new(None),
            writer: Mutex::new(None),
            connected: AtomicBool::new(false),
            max_frame_size,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn mark_closed(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::ConnectionFailed(format!("{address}: {e}")))?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "failed to set TCP_NODELAY");
        }

        let (read_half, write_half) = stream.into_split();
        *self.reader.lock().await = Some(FramedReader {
            half: read_half,
            frames: FrameBuffer::new(self.max_frame_size),
        });
        *self.writer.lock().await = Some(write_half);
        self.connected.store(true, Ordering::SeqCst);

        debug!(%address, "TCP connection established");
        Ok(())
    }

    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        let half = writer.as_mut().ok_or(TransportError::NotConnected)?;

        if let Err(e) = half.write_all(frame).await {
            self.mark_closed();
            return Err(TransportError::SendFailed(e.to_string()));
        }
        Ok(())
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        let mut reader = self.reader.lock().await;
        let reader = reader.as_mut().ok_or(TransportError::NotConnected)?;

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match reader.frames.next_frame() {
                Ok(Some(frame)) => return Ok(frame),
                Ok(None) => {}
                Err(e) => {
                    self.mark_closed();
                    return Err(TransportError::Frame(e));
                }
            }

            let n = match reader.half.read(&mut chunk).await {
                Ok(n) => n,
                Err(e) => {
                    self.mark_closed();
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
            };
            if n == 0 {
                self.mark_closed();
                return Err(TransportError::ConnectionClosed);
            }
            reader.frames.extend(&chunk[..n]);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.mark_closed();

        if let Some(mut half) = self.writer.lock().await.take() {
            // peer sees EOF; a failed shutdown on a dead socket is irrelevant
            let _ = half.shutdown().await;
        }
        // A reader still blocked in recv() holds the lock; it ends once the
        // relay answers our shutdown with EOF.
        if let Ok(mut reader) = self.reader.try_lock() {
            reader.take();
        }
        Ok(())
    }
}
