//! # vsync
//!
//! Command line peer for vsync editor view synchronization.
//!
//! ## Commands
//!
//! - `connect`: Run an interactive terminal peer
//! - `send`: Send a single message to the relay and exit
//! - `relay`: Run a relay in the foreground
//! - `config`: Show the resolved client configuration
//!
//! ## Example
//!
//! ```bash
//! # Start a relay
//! vsync relay --bind 127.0.0.1:3000
//!
//! # In two other terminals, start peers
//! vsync connect
//!
//! # Script a peer
//! vsync send open /home/me/notes.md
//! vsync send cursor /home/me/notes.md 12 4
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod terminal;

use commands::{connect, relay, send};
use config::Settings;

/// Command line peer for vsync editor view synchronization.
#[derive(Parser, Debug)]
#[command(name = "vsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Client configuration file (default: platform config dir/vsync/client.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Relay host, overriding the configuration file
    #[arg(long, global = true)]
    host: Option<String>,

    /// Relay port, overriding the configuration file
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Enable verbose output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run an interactive terminal peer
    Connect {
        /// Start with sync turned off (use `toggle` to enable)
        #[arg(long)]
        disabled: bool,
    },

    /// Send one message to the relay and exit
    Send {
        #[command(subcommand)]
        message: send::SendMessage,
    },

    /// Run a relay in the foreground
    Relay {
        /// Listening address (default: 127.0.0.1:3000)
        #[arg(long, short)]
        bind: Option<String>,

        /// Relay configuration file
        #[arg(long)]
        relay_config: Option<PathBuf>,
    },

    /// Show the resolved client configuration
    Config {
        /// Print the configuration file location instead
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, matches!(cli.command, Commands::Relay { .. }));

    let settings = Settings {
        config_path: cli.config,
        host: cli.host,
        port: cli.port,
    };

    match cli.command {
        Commands::Connect { disabled } => {
            connect::run(&settings, !disabled).await?;
        }
        Commands::Send { message } => {
            send::run(&settings, message).await?;
        }
        Commands::Relay { bind, relay_config } => {
            relay::run(bind, relay_config.as_deref()).await?;
        }
        Commands::Config { path } => {
            commands::config::run(&settings, path)?;
        }
    }

    Ok(())
}

/// Log to stderr; quiet by default so terminal output stays readable.
fn init_tracing(verbose: u8, relay: bool) {
    let default_level = match (verbose, relay) {
        (0, false) => "warn",
        (0, true) | (1, _) => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}
