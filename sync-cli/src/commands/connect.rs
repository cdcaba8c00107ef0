//! Interactive terminal peer.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use vsync_client::{ClientConfig, SyncClient, SyncEvent, SyncHandle, SyncStatus, TcpTransport};

use crate::config::Settings;
use crate::terminal::{parse_command, TerminalCommand, TerminalEditor, HELP};

/// A running client together with the configuration it was built from.
struct Peer {
    config: ClientConfig,
    handle: SyncHandle,
    events: broadcast::Receiver<SyncEvent>,
}

impl Peer {
    fn spawn(config: ClientConfig, editor: TerminalEditor) -> Self {
        let transport =
            TcpTransport::new(config.max_frame_size).with_connect_timeout(config.connect_timeout());
        let handle = SyncClient::new(config.clone(), transport, editor).spawn();
        let events = handle.subscribe();
        Self {
            config,
            handle,
            events,
        }
    }
}

/// Run the connect command.
pub async fn run(settings: &Settings, enable: bool) -> Result<()> {
    let editor = TerminalEditor::new();
    let mut peer = Peer::spawn(settings.load()?, editor.clone());

    println!("vsync peer for relay {}", peer.config.address());
    println!("type `help` for commands");
    if enable {
        peer.handle.enable()?;
    }
    print_status(peer.handle.status());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(TerminalCommand::Quit)) => break,
                    Ok(Some(command)) => {
                        peer = handle_command(peer, command, settings, &editor).await?;
                    }
                    Err(message) => println!("{message}"),
                }
            }
            event = peer.events.recv() => match event {
                Ok(event) => print_event(&event, peer.handle.status()),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::debug!("missed {} sync events", missed);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    peer.handle.shutdown().await?;
    Ok(())
}

async fn handle_command(
    mut peer: Peer,
    command: TerminalCommand,
    settings: &Settings,
    editor: &TerminalEditor,
) -> Result<Peer> {
    match &command {
        TerminalCommand::Toggle => {
            if peer.handle.status() == SyncStatus::Off {
                peer = reload(peer, settings, editor).await?;
                peer.handle.enable()?;
            } else {
                peer.handle.disable()?;
            }
        }
        TerminalCommand::Status => print_status(peer.handle.status()),
        TerminalCommand::Show => println!("{}", editor.describe()),
        TerminalCommand::Help => println!("{HELP}"),
        TerminalCommand::Quit => {}
        TerminalCommand::Open(_) | TerminalCommand::Close(_) | TerminalCommand::Cursor { .. } => {
            editor.apply_local(&command);
            if let Some(event) = command.local_event() {
                if let Err(e) = peer.handle.local_event(event) {
                    println!("{e}");
                }
            }
        }
    }
    Ok(peer)
}

/// Re-read the configuration before switching sync on; restart the client
/// if it changed.
async fn reload(peer: Peer, settings: &Settings, editor: &TerminalEditor) -> Result<Peer> {
    let config = match settings.load() {
        Ok(config) => config,
        Err(e) => {
            println!("keeping previous configuration: {e:#}");
            return Ok(peer);
        }
    };
    if config == peer.config {
        return Ok(peer);
    }

    println!("configuration changed, relay is now {}", config.address());
    peer.handle.shutdown().await?;
    Ok(Peer::spawn(config, editor.clone()))
}

fn print_event(event: &SyncEvent, status: SyncStatus) {
    println!("[{event}] {}", status.label());
}

fn print_status(status: SyncStatus) {
    println!("{} ({})", status.label(), status.tooltip());
}
