//! SyncClient - the peer runtime for vsync.
//!
//! This module provides [`SyncClient`], which runs one peer of a sync
//! session: it keeps a connection to the relay, publishes local editor
//! changes and applies remote ones.
//!
//! # Architecture
//!
//! A single task owns the [`SyncEngine`] (from sync-core) and interprets the
//! effects it returns. Connect attempts and the stream reader run as
//! separate tasks and report back over a channel; each report carries the
//! connection generation it belongs to, so results from an abandoned
//! connection are ignored.
//!
//! ```text
//! SyncHandle ──command──► actor ──► Transport ──► relay
//!                           │  ▲
//!                           │  └── reader task ◄── relay
//!                           ▼
//!                     EditorAdapter
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vsync_client::{ClientConfig, SyncClient, TcpTransport};
//!
//! let config = ClientConfig::new("127.0.0.1", 3000);
//! let transport = TcpTransport::new(config.max_frame_size);
//! let handle = SyncClient::new(config, transport, editor).spawn();
//!
//! handle.enable()?;
//! handle.local_event(LocalEvent::ActiveDocumentChanged { path: "/tmp/x".into() })?;
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vsync_core::{Effect, LocalEvent, SyncEngine, SyncEvent, SyncStatus};
use vsync_types::{is_absolute_path, CodecError, Message};

use crate::adapter::{self, EditorAdapter};
use crate::config::{ClientConfig, ConfigError};
use crate::transport::{Transport, TransportError};

const EVENT_CAPACITY: usize = 64;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Encoding or validation error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The client task has shut down.
    #[error("sync client stopped")]
    Stopped,
}

/// Builder for a running sync peer.
pub struct SyncClient<T: Transport, A: EditorAdapter> {
    config: ClientConfig,
    transport: T,
    adapter: A,
}

impl<T, A> SyncClient<T, A>
where
    T: Transport + 'static,
    A: EditorAdapter + 'static,
{
    /// Create a new SyncClient. Nothing happens until [`spawn`](Self::spawn).
    pub fn new(config: ClientConfig, transport: T, adapter: A) -> Self {
        Self {
            config,
            transport,
            adapter,
        }
    }

    /// Start the client task on the current tokio runtime.
    ///
    /// The peer starts disabled. The task stops on [`SyncHandle::shutdown`]
    /// or once every handle is dropped.
    pub fn spawn(self) -> SyncHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (status_tx, status_rx) = watch::channel(SyncStatus::Off);

        let actor = Actor {
            engine: SyncEngine::new(self.config.timing()),
            address: self.config.address(),
            transport: Arc::new(self.transport),
            adapter: Arc::new(self.adapter),
            generation: 0,
            connect_task: None,
            reader_task: None,
            internal_tx,
            events: event_tx.clone(),
            status: status_tx,
        };
        tokio::spawn(actor.run(command_rx, internal_rx));

        SyncHandle {
            commands: command_tx,
            events: event_tx,
            status: status_rx,
        }
    }
}

#[derive(Debug)]
enum Command {
    Enable,
    Disable,
    Toggle,
    Local(LocalEvent),
    Shutdown(oneshot::Sender<()>),
}

/// Cheap, cloneable control handle for a running [`SyncClient`].
#[derive(Debug, Clone)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<SyncEvent>,
    status: watch::Receiver<SyncStatus>,
}

impl SyncHandle {
    /// Turn synchronization on.
    pub fn enable(&self) -> Result<(), ClientError> {
        self.command(Command::Enable)
    }

    /// Turn synchronization off and drop the connection.
    pub fn disable(&self) -> Result<(), ClientError> {
        self.command(Command::Disable)
    }

    /// Flip synchronization on or off.
    pub fn toggle(&self) -> Result<(), ClientError> {
        self.command(Command::Toggle)
    }

    /// Report a change observed in the local editor.
    ///
    /// Fails immediately if the event's path is not absolute.
    pub fn local_event(&self, event: LocalEvent) -> Result<(), ClientError> {
        if !is_absolute_path(event.path()) {
            return Err(CodecError::InvalidPath {
                path: event.path().to_string(),
            }
            .into());
        }
        self.command(Command::Local(event))
    }

    /// Subscribe to lifecycle notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Current status.
    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    /// Wait until the status equals `target`.
    pub async fn wait_for_status(&self, target: SyncStatus) -> Result<(), ClientError> {
        let mut status = self.status.clone();
        status
            .wait_for(|s| *s == target)
            .await
            .map(|_| ())
            .map_err(|_| ClientError::Stopped)
    }

    /// Disable synchronization and stop the client task.
    pub async fn shutdown(self) -> Result<(), ClientError> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Shutdown(tx))?;
        rx.await.map_err(|_| ClientError::Stopped)
    }

    fn command(&self, command: Command) -> Result<(), ClientError> {
        self.commands.send(command).map_err(|_| ClientError::Stopped)
    }
}

/// Results reported by the connect and reader tasks.
#[derive(Debug)]
enum Internal {
    ConnectFinished {
        generation: u64,
        result: Result<(), TransportError>,
    },
    Frame {
        generation: u64,
        frame: Vec<u8>,
    },
    ReadFailed {
        generation: u64,
        error: TransportError,
    },
}

struct Actor<T, A> {
    engine: SyncEngine,
    address: String,
    transport: Arc<T>,
    adapter: Arc<A>,
    generation: u64,
    connect_task: Option<JoinHandle<()>>,
    reader_task: Option<JoinHandle<()>>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    events: broadcast::Sender<SyncEvent>,
    status: watch::Sender<SyncStatus>,
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

impl<T, A> Actor<T, A>
where
    T: Transport + 'static,
    A: EditorAdapter + 'static,
{
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
    ) {
        debug!(address = %self.address, "sync client started");

        loop {
            let deadline = self.engine.next_deadline();
            let timer = async {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at.into()).await,
                    None => std::future::pending().await,
                }
            };

            let effects = tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown(done)) => {
                        self.stop().await;
                        let _ = done.send(());
                        return;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        self.stop().await;
                        return;
                    }
                },
                Some(report) = internal.recv() => self.handle_internal(report),
                _ = timer => self.engine.poll_timers(now()),
            };

            self.execute(effects).await;
        }
    }

    fn handle_command(&mut self, command: Command) -> Vec<Effect> {
        let now = now();
        match command {
            Command::Enable => self.engine.enable(now),
            Command::Disable => self.engine.disable(now),
            Command::Toggle => self.engine.toggle(now),
            Command::Local(event) => match self.engine.local_event(now, event) {
                Ok(effects) => effects,
                Err(e) => {
                    warn!(error = %e, "dropping invalid local event");
                    vec![]
                }
            },
            Command::Shutdown(_) => vec![],
        }
    }

    fn handle_internal(&mut self, report: Internal) -> Vec<Effect> {
        let now = now();
        match report {
            Internal::ConnectFinished { generation, .. }
            | Internal::Frame { generation, .. }
            | Internal::ReadFailed { generation, .. }
                if generation != self.generation =>
            {
                debug!(generation, current = self.generation, "ignoring stale report");
                vec![]
            }
            Internal::ConnectFinished { result: Ok(()), .. } => {
                self.connect_task = None;
                let effects = self.engine.connect_succeeded(now);
                if self.engine.is_connected() {
                    info!(address = %self.address, "connected to relay");
                    self.spawn_reader();
                }
                effects
            }
            Internal::ConnectFinished {
                result: Err(error), ..
            } => {
                self.connect_task = None;
                warn!(address = %self.address, error = %error, "connect failed");
                self.engine.connect_failed(now, error.to_string())
            }
            Internal::Frame { frame, .. } => {
                let active = self.adapter.active_document();
                match self.engine.inbound_frame(now, &frame, active.as_deref()) {
                    Ok(effects) => effects,
                    Err(e) if e.is_unknown_type() => {
                        debug!(error = %e, "ignoring message of unknown type");
                        vec![]
                    }
                    Err(e) => {
                        warn!(error = %e, "dropping undecodable frame");
                        vec![]
                    }
                }
            }
            Internal::ReadFailed { error, .. } => {
                warn!(error = %error, "connection to relay lost");
                self.engine.connection_lost(now, error.to_string())
            }
        }
    }

    /// Run effects in order. Effects produced while running (a failed send)
    /// are appended to the queue.
    async fn execute(&mut self, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Connect => self.start_connect(),
                Effect::Disconnect => self.teardown().await,
                Effect::Send(message) => {
                    if let Err(e) = self.send(&message).await {
                        warn!(error = %e, kind = %message.kind(), "send failed");
                        if matches!(e, ClientError::Transport(_)) {
                            queue.extend(self.engine.connection_lost(now(), e.to_string()));
                        }
                    }
                }
                Effect::Apply(message) => {
                    debug!(kind = %message.kind(), path = message.path(), "applying remote change");
                    if let Err(e) = adapter::apply(self.adapter.as_ref(), &message).await {
                        warn!(error = %e, kind = %message.kind(), "failed to apply remote change");
                    }
                    self.engine.applied(now(), &message);
                }
                Effect::Notify(event) => {
                    debug!(%event, "sync event");
                    // no subscribers is fine
                    let _ = self.events.send(event);
                }
            }
        }

        self.status.send_if_modified(|status| {
            let next = self.engine.status();
            let changed = *status != next;
            *status = next;
            changed
        });
    }

    async fn send(&self, message: &Message) -> Result<(), ClientError> {
        let frame = message.to_frame()?;
        self.transport.send(&frame).await?;
        debug!(kind = %message.kind(), path = message.path(), "sent");
        Ok(())
    }

    fn start_connect(&mut self) {
        self.generation += 1;
        if let Some(task) = self.connect_task.take() {
            task.abort();
        }

        let generation = self.generation;
        let transport = Arc::clone(&self.transport);
        let address = self.address.clone();
        let reports = self.internal_tx.clone();
        debug!(%address, generation, "connecting");

        self.connect_task = Some(tokio::spawn(async move {
            let result = transport.connect(&address).await;
            let _ = reports.send(Internal::ConnectFinished { generation, result });
        }));
    }

    fn spawn_reader(&mut self) {
        let generation = self.generation;
        let transport = Arc::clone(&self.transport);
        let reports = self.internal_tx.clone();

        self.reader_task = Some(tokio::spawn(async move {
            loop {
                match transport.recv().await {
                    Ok(frame) => {
                        if reports.send(Internal::Frame { generation, frame }).is_err() {
                            return;
                        }
                    }
                    Err(error) => {
                        let _ = reports.send(Internal::ReadFailed { generation, error });
                        return;
                    }
                }
            }
        }));
    }

    /// Abandon the current connection (or connect attempt).
    ///
    /// Both tasks are awaited after the abort so no connect can settle and
    /// no reader can hold the transport once `close()` runs.
    async fn teardown(&mut self) {
        self.generation += 1;
        for task in [self.connect_task.take(), self.reader_task.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
            let _ = task.await;
        }
        if let Err(e) = self.transport.close().await {
            debug!(error = %e, "error closing transport");
        }
    }

    async fn stop(&mut self) {
        let effects = self.engine.disable(now());
        self.execute(effects).await;
        self.teardown().await;
        debug!("sync client stopped");
    }
}
