//! Listener and accept loop.

use crate::config::RelayConfig;
use crate::error::Result;
use crate::server::Relay;
use crate::session::Session;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Pause after a failed accept (e.g. file descriptor exhaustion).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// A bound relay, ready to accept peers.
#[derive(Debug)]
pub struct RelayServer {
    listener: TcpListener,
    relay: Arc<Relay>,
}

impl RelayServer {
    /// Bind the listening socket from `config.server.bind_address`.
    pub async fn bind(config: RelayConfig) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(&config.server.bind_address).await?;
        Ok(Self {
            listener,
            relay: Arc::new(Relay::new(config)),
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared relay state.
    pub fn relay(&self) -> Arc<Relay> {
        Arc::clone(&self.relay)
    }

    /// Accept peers forever.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept peers until `shutdown` completes.
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tokio::pin!(shutdown);
        tracing::info!("Relay listening on {}", self.local_addr()?);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Relay shutting down ({} peers online)", self.relay.peers().len());
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            tracing::debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                        }
                        let session = Session::new(self.relay(), stream, addr);
                        // Spawn session handler - don't block the accept loop
                        tokio::spawn(async move {
                            if let Err(e) = session.run().await {
                                tracing::warn!("Session with {} ended: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!("Accept failed: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }
    }
}
