//! Send a single message to the relay.

use anyhow::{Context, Result};
use clap::Subcommand;
use vsync_client::{TcpTransport, Transport};
use vsync_types::Message;

use crate::config::Settings;

/// Message to send.
#[derive(Subcommand, Debug)]
pub enum SendMessage {
    /// Tell peers to open and focus a document
    Open {
        /// Absolute document path
        path: String,
    },
    /// Tell peers to close a document
    Close {
        /// Absolute document path
        path: String,
    },
    /// Move peers' cursor (zero-based coordinates)
    Cursor {
        /// Absolute document path
        path: String,
        /// Line
        line: u32,
        /// Column
        character: u32,
    },
}

impl From<SendMessage> for Message {
    fn from(message: SendMessage) -> Self {
        match message {
            SendMessage::Open { path } => Message::open_file(path),
            SendMessage::Close { path } => Message::close_file(path),
            SendMessage::Cursor {
                path,
                line,
                character,
            } => Message::cursor_move(path, line, character),
        }
    }
}

/// Run the send command.
pub async fn run(settings: &Settings, message: SendMessage) -> Result<()> {
    let config = settings.load()?;
    let message = Message::from(message);
    let frame = message.to_frame().context("Invalid message")?;

    let address = config.address();
    let transport =
        TcpTransport::new(config.max_frame_size).with_connect_timeout(config.connect_timeout());
    transport
        .connect(&address)
        .await
        .with_context(|| format!("Failed to connect to relay at {address}"))?;
    transport
        .send(&frame)
        .await
        .context("Failed to send message")?;
    transport.close().await?;

    println!("sent {} {}", message.kind(), message.path());
    Ok(())
}
