//! Client configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! [relay]
//! host = "127.0.0.1"
//! port = 3000
//!
//! [timing]
//! reconnect_delay_ms = 5000
//! debounce_ms = 50
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vsync_core::Timing;
use vsync_types::DEFAULT_MAX_FRAME_SIZE;

/// Root client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Largest accepted inbound frame in bytes (default: 64 KiB).
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
    /// Relay location.
    #[serde(default)]
    pub relay: RelayAddress,
    /// Timing constants.
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Where the relay listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayAddress {
    /// Host name or IP address (default: 127.0.0.1).
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port (default: 3000).
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Timing constants in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Delay before each reconnect attempt (default: 5000).
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Cursor debounce window (default: 50).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Echo suppression after a remote open/close (default: 100).
    #[serde(default = "default_open_close_suppression_ms")]
    pub open_close_suppression_ms: u64,
    /// Echo suppression after a remote cursor move (default: 50).
    #[serde(default = "default_cursor_suppression_ms")]
    pub cursor_suppression_ms: u64,
    /// Limit for establishing the TCP connection (default: 10000).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

fn default_debounce_ms() -> u64 {
    50
}

fn default_open_close_suppression_ms() -> u64 {
    100
}

fn default_cursor_suppression_ms() -> u64 {
    50
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_max_frame_size() -> usize {
    DEFAULT_MAX_FRAME_SIZE
}

impl Default for RelayAddress {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            debounce_ms: default_debounce_ms(),
            open_close_suppression_ms: default_open_close_suppression_ms(),
            cursor_suppression_ms: default_cursor_suppression_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay: RelayAddress::default(),
            timing: TimingConfig::default(),
            max_frame_size: default_max_frame_size(),
        }
    }
}

impl ClientConfig {
    /// Configuration for a relay at `host:port` with default timing.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            relay: RelayAddress {
                host: host.into(),
                port,
            },
            ..Self::default()
        }
    }

    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the client cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relay.host.trim().is_empty() {
            return Err(ConfigError::Invalid("relay.host must not be empty".into()));
        }
        if self.relay.port == 0 {
            return Err(ConfigError::Invalid("relay.port must not be 0".into()));
        }
        if self.timing.reconnect_delay_ms == 0 {
            return Err(ConfigError::Invalid(
                "timing.reconnect_delay_ms must be positive".into(),
            ));
        }
        if self.max_frame_size == 0 {
            return Err(ConfigError::Invalid("max_frame_size must be positive".into()));
        }
        Ok(())
    }

    /// `host:port` suitable for connecting; IPv6 literals are bracketed.
    pub fn address(&self) -> String {
        let host = &self.relay.host;
        if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{}", self.relay.port)
        } else {
            format!("{host}:{}", self.relay.port)
        }
    }

    /// Engine timing derived from the `[timing]` section.
    pub fn timing(&self) -> Timing {
        Timing {
            reconnect_delay: Duration::from_millis(self.timing.reconnect_delay_ms),
            debounce: Duration::from_millis(self.timing.debounce_ms),
            open_close_suppression: Duration::from_millis(self.timing.open_close_suppression_ms),
            cursor_suppression: Duration::from_millis(self.timing.cursor_suppression_ms),
        }
    }

    /// TCP connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.timing.connect_timeout_ms)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
