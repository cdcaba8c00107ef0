//! Show the resolved client configuration.

use anyhow::{Context, Result};

use crate::config::{default_config_path, Settings};

/// Run the config command.
pub fn run(settings: &Settings, path_only: bool) -> Result<()> {
    if path_only {
        match settings.config_path.clone().or_else(default_config_path) {
            Some(path) => println!("{}", path.display()),
            None => anyhow::bail!("Could not determine the configuration directory"),
        }
        return Ok(());
    }

    let config = settings.load()?;
    match settings.source() {
        Some(path) => println!("# loaded from {}", path.display()),
        None => println!("# defaults (no configuration file)"),
    }
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    print!("{rendered}");
    Ok(())
}
