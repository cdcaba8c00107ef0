//! Run a relay in the foreground.

use anyhow::{Context, Result};
use std::path::Path;
use vsync_relay::{RelayConfig, RelayServer};

/// Run the relay command until ctrl-c.
pub async fn run(bind: Option<String>, config_path: Option<&Path>) -> Result<()> {
    let mut config = match config_path {
        Some(path) => RelayConfig::from_file(path)
            .with_context(|| format!("Failed to load relay configuration from {}", path.display()))?,
        None => RelayConfig::default(),
    };
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }

    let bind_address = config.server.bind_address.clone();
    let server = RelayServer::bind(config)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    println!("relay listening on {}", server.local_addr()?);

    server
        .run_until(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}
