//! Mock transport for testing.
//!
//! Allows injecting inbound frames, dropping the connection and capturing
//! sent frames for verification.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use vsync_types::Message;

/// Mock transport for testing.
///
/// Clones share state, so a test keeps one clone while the client owns
/// another.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
    inbound: Arc<tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<Vec<u8>>>>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    connected: bool,
    connected_address: Option<String>,
    connect_attempts: usize,
    sent_frames: Vec<Vec<u8>>,
    inbound_tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    unreachable: bool,
    fail_next_connect: Option<String>,
    fail_next_send: Option<String>,
    connect_delay: Option<Duration>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver a frame to the current connection's `recv()`.
    ///
    /// Returns false if there is no connection to deliver to.
    pub fn push_inbound(&self, frame: impl Into<Vec<u8>>) -> bool {
        let inner = self.inner();
        match &inner.inbound_tx {
            Some(tx) => tx.send(frame.into()).is_ok(),
            None => false,
        }
    }

    /// Deliver an encoded message.
    pub fn push_message(&self, message: &Message) -> bool {
        match message.to_frame() {
            Ok(frame) => self.push_inbound(frame),
            Err(_) => false,
        }
    }

    /// Simulate the relay going away: pending and future `recv()` calls
    /// return [`TransportError::ConnectionClosed`].
    pub fn drop_connection(&self) {
        let mut inner = self.inner();
        inner.connected = false;
        inner.inbound_tx = None;
    }

    /// Get all frames that were sent.
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.inner().sent_frames.clone()
    }

    /// Decode all sent frames.
    pub fn sent_messages(&self) -> Vec<Message> {
        self.inner()
            .sent_frames
            .iter()
            .filter_map(|frame| Message::from_bytes(frame).ok())
            .collect()
    }

    /// Get the last frame that was sent.
    pub fn last_sent(&self) -> Option<Vec<u8>> {
        self.inner().sent_frames.last().cloned()
    }

    /// Forget captured frames.
    pub fn clear_sent(&self) {
        self.inner().sent_frames.clear();
    }

    /// Get the address that was connected to.
    pub fn connected_address(&self) -> Option<String> {
        self.inner().connected_address.clone()
    }

    /// Number of `connect()` calls so far, successful or not.
    pub fn connect_attempts(&self) -> usize {
        self.inner().connect_attempts
    }

    /// Make every `connect()` fail until reset.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner().unreachable = unreachable;
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        self.inner().fail_next_connect = Some(error.to_string());
    }

    /// Make `connect()` take `delay` before it settles.
    pub fn set_connect_delay(&self, delay: Duration) {
        self.inner().connect_delay = Some(delay);
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        self.inner().fail_next_send = Some(error.to_string());
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            inbound: Arc::clone(&self.inbound),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let delay = self.inner().connect_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let rx = {
            let mut inner = self.inner();
            inner.connect_attempts += 1;

            // Check for forced failure
            if let Some(error) = inner.fail_next_connect.take() {
                return Err(TransportError::ConnectionFailed(error));
            }
            if inner.unreachable {
                return Err(TransportError::ConnectionFailed(format!(
                    "{address}: connection refused"
                )));
            }

            let (tx, rx) = mpsc::unbounded_channel();
            inner.connected = true;
            inner.connected_address = Some(address.to_string());
            inner.inbound_tx = Some(tx);
            rx
        };

        *self.inbound.lock().await = Some(rx);
        Ok(())
    }

    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.inner();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent_frames.push(frame.to_vec());
        Ok(())
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        let mut inbound = self.inbound.lock().await;
        let rx = inbound.as_mut().ok_or(TransportError::NotConnected)?;
        rx.recv().await.ok_or(TransportError::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        self.inner().connected
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut inner = self.inner();
        inner.connected = false;
        inner.inbound_tx = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===========================================
    // MockTransport Basic Tests
    // ===========================================

    #[tokio::test]
    async fn mock_transport_connects() {
        let transport = MockTransport::new();
        assert!(!transport.is_connected());

        transport.connect("127.0.0.1:3000").await.unwrap();

        assert!(transport.is_connected());
        assert_eq!(
            transport.connected_address(),
            Some("127.0.0.1:3000".to_string())
        );
        assert_eq!(transport.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn mock_transport_sends_frames() {
        let transport = MockTransport::new();
        transport.connect("relay").await.unwrap();

        transport
            .send(&Message::open_file("/a").to_frame().unwrap())
            .await
            .unwrap();
        transport.send(b"garbage\n").await.unwrap();

        assert_eq!(transport.sent_frames().len(), 2);
        assert_eq!(transport.sent_messages(), vec![Message::open_file("/a")]);
        assert_eq!(transport.last_sent(), Some(b"garbage\n".to_vec()));
    }

    #[tokio::test]
    async fn mock_transport_receives_pushed_frames() {
        let transport = MockTransport::new();
        transport.connect("relay").await.unwrap();

        assert!(transport.push_message(&Message::close_file("/a")));
        assert!(transport.push_inbound(b"raw\n".to_vec()));

        let first = transport.recv().await.unwrap();
        assert_eq!(Message::from_bytes(&first).unwrap(), Message::close_file("/a"));
        assert_eq!(transport.recv().await.unwrap(), b"raw\n");
    }

    // ===========================================
    // Failure Injection Tests
    // ===========================================

    #[tokio::test]
    async fn mock_transport_not_connected_errors() {
        let transport = MockTransport::new();

        assert!(matches!(
            transport.send(b"data").await,
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            transport.recv().await,
            Err(TransportError::NotConnected)
        ));
        assert!(!transport.push_inbound(b"x".to_vec()));
    }

    #[tokio::test]
    async fn mock_transport_fail_next_connect() {
        let transport = MockTransport::new();
        transport.fail_next_connect("network unreachable");

        let result = transport.connect("relay").await;
        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
        assert!(!transport.is_connected());

        // Second attempt should succeed
        transport.connect("relay").await.unwrap();
        assert!(transport.is_connected());
        assert_eq!(transport.connect_attempts(), 2);
    }

    #[tokio::test]
    async fn mock_transport_unreachable() {
        let transport = MockTransport::new();
        transport.set_unreachable(true);
        for _ in 0..3 {
            assert!(transport.connect("relay").await.is_err());
        }
        assert_eq!(transport.connect_attempts(), 3);

        transport.set_unreachable(false);
        transport.connect("relay").await.unwrap();
    }

    #[tokio::test]
    async fn mock_transport_fail_next_send() {
        let transport = MockTransport::new();
        transport.connect("relay").await.unwrap();
        transport.fail_next_send("broken pipe");

        assert!(matches!(
            transport.send(b"data").await,
            Err(TransportError::SendFailed(_))
        ));
        transport.send(b"data").await.unwrap();
    }

    #[tokio::test]
    async fn drop_connection_ends_pending_recv() {
        let transport = MockTransport::new();
        transport.connect("relay").await.unwrap();

        let reader = transport.clone();
        let pending = tokio::spawn(async move { reader.recv().await });
        tokio::task::yield_now().await;

        transport.drop_connection();
        assert!(matches!(
            pending.await.unwrap(),
            Err(TransportError::ConnectionClosed)
        ));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let transport1 = MockTransport::new();
        let transport2 = transport1.clone();

        transport1.connect("relay").await.unwrap();
        assert!(transport2.is_connected());

        transport2.send(b"from clone").await.unwrap();
        assert_eq!(transport1.sent_frames(), vec![b"from clone".to_vec()]);
    }
}
