//! Configuration loading for sync-relay.
//!
//! Configuration is loaded from a TOML file; every field has a default, so
//! an empty file (or no file) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for sync-relay.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening address (default: 127.0.0.1:3000).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Resource limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Largest frame a peer may send, in bytes (default: 64 KiB).
    /// A peer exceeding it is disconnected.
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
    /// Frames queued per peer before the peer is considered stuck and
    /// dropped (default: 256).
    #[serde(default = "default_peer_queue_capacity")]
    pub peer_queue_capacity: usize,
}

// Default value functions
fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_max_frame_size() -> usize {
    vsync_types::DEFAULT_MAX_FRAME_SIZE
}

fn default_peer_queue_capacity() -> usize {
    256
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_frame_size: default_max_frame_size(),
            peer_queue_capacity: default_peer_queue_capacity(),
        }
    }
}

impl RelayConfig {
    /// Default configuration listening on `bind_address`.
    pub fn with_bind_address(bind_address: impl Into<String>) -> Self {
        Self {
            server: ServerConfig {
                bind_address: bind_address.into(),
            },
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
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

    /// Reject limits the relay cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_frame_size == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_frame_size must be positive".into(),
            ));
        }
        if self.limits.peer_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "limits.peer_queue_capacity must be positive".into(),
            ));
        }
        Ok(())
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
