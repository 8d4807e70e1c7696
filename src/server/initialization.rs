// src/server/initialization.rs

//! Creates and binds the passive socket before the event loop starts.

use super::context::ServerContext;
use crate::config::Config;
use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

/// Binds the listener. Any failure here is fatal to the process.
pub async fn setup(config: Config) -> Result<ServerContext> {
    config.validate()?;
    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind passive socket on {addr}"))?;
    let local = listener.local_addr()?;

    log_startup_info(&config, local);

    Ok(ServerContext { config, listener })
}

fn log_startup_info(config: &Config, local: std::net::SocketAddr) {
    info!("chatrelay {} listening on {}", crate::VERSION, local);
    info!("To connect to this server, type: telnet {} {}", local.ip(), local.port());
    info!(
        "Clients will be timed out after being idle for {:?}.",
        config.idle_timeout
    );
    info!("Quit matching policy: {:?}.", config.quit_match);
}
