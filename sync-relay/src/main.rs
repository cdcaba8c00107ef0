//! vsync-relay binary entry point.
//!
//! Usage:
//! ```bash
//! vsync-relay --config relay.toml
//! vsync-relay --bind 0.0.0.0:3000 -v
//! vsync-relay --help
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vsync_relay::{RelayConfig, RelayServer};

/// Broadcast relay for vsync editor peers.
#[derive(Parser, Debug)]
#[command(name = "vsync-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listening address, overriding the configuration file.
    #[arg(short, long)]
    bind: Option<String>,

    /// Enable verbose output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => RelayConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RelayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    let bind_address = config.server.bind_address.clone();
    let server = RelayServer::bind(config)
        .await
        .with_context(|| format!("binding {bind_address}"))?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}
