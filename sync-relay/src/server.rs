//! Peer registry and broadcast.
//!
//! [`Relay`] owns the set of connected peers and fans frames out to them.
//! Sessions (see [`crate::session`]) register with it on accept and remove
//! themselves on disconnect.

use crate::config::RelayConfig;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Identifier of a connected peer, unique for the lifetime of the process.
pub type PeerId = u64;

/// A frame shared by every recipient of one broadcast.
pub type SharedFrame = Arc<[u8]>;

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total connections accepted.
    pub connections_total: AtomicU64,
    /// Total frames received from peers and broadcast.
    pub frames_relayed: AtomicU64,
    /// Total bytes enqueued for delivery (frame size times recipients).
    pub bytes_relayed: AtomicU64,
    /// Deliveries abandoned because a peer's queue was full or closed.
    pub deliveries_dropped: AtomicU64,
    /// Peers removed from the set, for any reason.
    pub peers_removed: AtomicU64,
}

#[derive(Debug)]
struct PeerHandle {
    addr: SocketAddr,
    outbound: mpsc::Sender<SharedFrame>,
}

/// The set of currently connected peers.
///
/// A peer is present from accept until its session observes a close or an
/// error, or until a broadcast gives up on it. Ids are never reused, so a
/// peer cannot appear twice.
#[derive(Debug, Default)]
pub struct PeerSet {
    peers: DashMap<PeerId, PeerHandle>,
    next_id: AtomicU64,
}

impl PeerSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer and return its id.
    pub fn insert(&self, addr: SocketAddr, outbound: mpsc::Sender<SharedFrame>) -> PeerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.peers.insert(id, PeerHandle { addr, outbound });
        id
    }

    /// Remove a peer. Returns false if it was already gone.
    ///
    /// Dropping the peer's queue sender ends its writer task.
    pub fn remove(&self, id: PeerId) -> bool {
        self.peers.remove(&id).is_some()
    }

    /// Whether `id` is connected.
    pub fn contains(&self, id: PeerId) -> bool {
        self.peers.contains_key(&id)
    }

    /// Remote address of a connected peer.
    pub fn addr(&self, id: PeerId) -> Option<SocketAddr> {
        self.peers.get(&id).map(|peer| peer.addr)
    }

    /// Number of connected peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether no peer is connected.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Point-in-time copy of every peer except `exclude`.
    ///
    /// No map lock is held once this returns, so delivering to the snapshot
    /// cannot race with concurrent insert or remove.
    fn snapshot_except(&self, exclude: PeerId) -> Vec<(PeerId, mpsc::Sender<SharedFrame>)> {
        self.peers
            .iter()
            .filter(|entry| *entry.key() != exclude)
            .map(|entry| (*entry.key(), entry.value().outbound.clone()))
            .collect()
    }
}

/// Shared relay state.
#[derive(Debug)]
pub struct Relay {
    config: RelayConfig,
    peers: PeerSet,
    metrics: RelayMetrics,
}

impl Relay {
    /// Create a relay with no peers.
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            peers: PeerSet::new(),
            metrics: RelayMetrics::default(),
        }
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Get the connected peers.
    pub fn peers(&self) -> &PeerSet {
        &self.peers
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Register a newly accepted peer.
    ///
    /// Returns its id and the receiving end of its outbound queue.
    pub fn register(&self, addr: SocketAddr) -> (PeerId, mpsc::Receiver<SharedFrame>) {
        let (tx, rx) = mpsc::channel(self.config.limits.peer_queue_capacity);
        let id = self.peers.insert(addr, tx);
        self.metrics.connections_total.fetch_add(1, Ordering::Relaxed);
        (id, rx)
    }

    /// Remove a peer. Safe to call more than once.
    pub fn remove_peer(&self, id: PeerId) -> bool {
        let removed = self.peers.remove(id);
        if removed {
            self.metrics.peers_removed.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Removed peer {} ({} remaining)", id, self.peers.len());
        }
        removed
    }

    /// Enqueue `frame` for every connected peer except `from`.
    ///
    /// Never waits on a slow peer: a full or closed queue drops that peer
    /// and delivery continues to the rest. Returns the number of peers the
    /// frame was queued for.
    pub fn broadcast(&self, from: PeerId, frame: &[u8]) -> usize {
        let frame: SharedFrame = Arc::from(frame);
        let mut delivered = 0usize;

        for (id, outbound) in self.peers.snapshot_except(from) {
            match outbound.try_send(Arc::clone(&frame)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!("Peer {} is not keeping up, dropping it", id);
                    self.metrics.deliveries_dropped.fetch_add(1, Ordering::Relaxed);
                    self.remove_peer(id);
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!("Peer {} already closed", id);
                    self.metrics.deliveries_dropped.fetch_add(1, Ordering::Relaxed);
                    self.remove_peer(id);
                }
            }
        }

        self.metrics.frames_relayed.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .bytes_relayed
            .fetch_add((frame.len() * delivered) as u64, Ordering::Relaxed);
        tracing::debug!(
            "Relayed {} bytes from peer {} to {} peers",
            frame.len(),
            from,
            delivered
        );
        delivered
    }
}
