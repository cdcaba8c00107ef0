//! Per-connection session management.
//!
//! Each accepted connection gets a Session: a read loop that reassembles
//! frames and broadcasts them, plus a writer task that drains the peer's
//! outbound queue onto the socket.

use crate::error::{SessionError, SessionResult};
use crate::server::{PeerId, Relay, SharedFrame};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use vsync_types::FrameBuffer;

const READ_CHUNK: usize = 8 * 1024;

/// A per-connection session.
pub struct Session {
    relay: Arc<Relay>,
    stream: TcpStream,
    addr: SocketAddr,
}

impl Session {
    /// Create a new session for an accepted connection.
    pub fn new(relay: Arc<Relay>, stream: TcpStream, addr: SocketAddr) -> Self {
        Self {
            relay,
            stream,
            addr,
        }
    }

    /// Run the session until the peer disconnects or fails.
    ///
    /// The peer is in the relay's set for exactly the duration of this call.
    pub async fn run(self) -> SessionResult<()> {
        let Session {
            relay,
            stream,
            addr,
        } = self;

        let (id, outbound) = relay.register(addr);
        tracing::info!(
            "Peer {} connected from {} ({} online)",
            id,
            addr,
            relay.peers().len()
        );

        let (read_half, write_half) = stream.into_split();
        let mut writer = tokio::spawn(write_loop(Arc::clone(&relay), id, outbound, write_half));

        let result = tokio::select! {
            read = read_loop(&relay, id, read_half) => read,
            written = &mut writer => match written {
                Ok(result) => result,
                Err(e) => Err(SessionError::Writer(e.to_string())),
            },
        };

        writer.abort();
        relay.remove_peer(id);

        let metrics = relay.metrics();
        tracing::info!(
            "Peer {} ({}) disconnected: {} online, {} frames relayed, {} dropped deliveries",
            id,
            addr,
            relay.peers().len(),
            metrics.frames_relayed.load(Ordering::Relaxed),
            metrics.deliveries_dropped.load(Ordering::Relaxed),
        );
        result
    }
}

/// Read frames from the peer and broadcast each one. Returns `Ok` on a
/// clean close.
async fn read_loop(relay: &Relay, id: PeerId, mut half: OwnedReadHalf) -> SessionResult<()> {
    let mut frames = FrameBuffer::new(relay.config().limits.max_frame_size);
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        let n = half.read(&mut chunk).await.map_err(SessionError::Read)?;
        if n == 0 {
            return Ok(());
        }
        frames.extend(&chunk[..n]);

        while let Some(frame) = frames.next_frame()? {
            relay.broadcast(id, &frame);
        }
    }
}

/// Write queued frames to the peer until its queue closes or it leaves the
/// peer set.
async fn write_loop(
    relay: Arc<Relay>,
    id: PeerId,
    mut outbound: mpsc::Receiver<SharedFrame>,
    mut half: OwnedWriteHalf,
) -> SessionResult<()> {
    while let Some(frame) = outbound.recv().await {
        if !relay.peers().contains(id) {
            break;
        }
        half.write_all(&frame).await.map_err(SessionError::Write)?;
    }
    // best effort; the socket is going away either way
    let _ = half.shutdown().await;
    Ok(())
}
