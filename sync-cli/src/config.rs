//! Configuration management for the vsync CLI.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use vsync_client::ClientConfig;

/// Where the client configuration comes from.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Explicit `--config` path.
    pub config_path: Option<PathBuf>,
    /// `--host` override.
    pub host: Option<String>,
    /// `--port` override.
    pub port: Option<u16>,
}

impl Settings {
    /// The file the configuration is read from, if any.
    ///
    /// An explicit path always counts; the default location only if it exists.
    pub fn source(&self) -> Option<PathBuf> {
        match &self.config_path {
            Some(path) => Some(path.clone()),
            None => default_config_path().filter(|path| path.exists()),
        }
    }

    /// Read the configuration file (or defaults) and apply overrides.
    ///
    /// Called again whenever sync is switched on, so edits take effect
    /// without restarting.
    pub fn load(&self) -> Result<ClientConfig> {
        let mut config = match self.source() {
            Some(path) => load_file(&path)?,
            None => ClientConfig::default(),
        };

        if let Some(host) = &self.host {
            config.relay.host = host.clone();
        }
        if let Some(port) = self.port {
            config.relay.port = port;
        }
        config.validate().context("Invalid client configuration")?;
        Ok(config)
    }
}

fn load_file(path: &Path) -> Result<ClientConfig> {
    ClientConfig::from_file(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Get the default configuration file location.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "ydun", "vsync")
        .map(|dirs| dirs.config_dir().join("client.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn overrides_apply_on_top_of_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[relay]\nhost = \"relay.lan\"\nport = 4000").unwrap();

        let settings = Settings {
            config_path: Some(file.path().to_path_buf()),
            host: None,
            port: Some(4100),
        };
        let config = settings.load().unwrap();
        assert_eq!(config.address(), "relay.lan:4100");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let settings = Settings {
            config_path: Some(PathBuf::from("/nonexistent/client.toml")),
            ..Settings::default()
        };
        assert!(settings.load().is_err());
    }

    #[test]
    fn invalid_override_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file).unwrap();

        let settings = Settings {
            config_path: Some(file.path().to_path_buf()),
            host: Some(String::new()),
            port: None,
        };
        assert!(settings.load().is_err());
    }

    #[test]
    fn reload_sees_file_changes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[relay]\nport = 3001").unwrap();
        let settings = Settings {
            config_path: Some(file.path().to_path_buf()),
            ..Settings::default()
        };
        assert_eq!(settings.load().unwrap().relay.port, 3001);

        std::fs::write(file.path(), "[relay]\nport = 3002\n").unwrap();
        assert_eq!(settings.load().unwrap().relay.port, 3002);
    }
}
