// src/server/mod.rs

use crate::config::Config;
use crate::core::RelayStats;
use anyhow::{Result, anyhow};
use std::future::Future;
use std::net::SocketAddr;
use tokio::signal::unix::{SignalKind, signal};
use tracing::info;

mod context;
mod event_loop;
mod initialization;

pub use event_loop::EventLoop;

/// A bound relay, ready to run.
pub struct Relay {
    event_loop: EventLoop,
}

impl Relay {
    /// Binds the passive socket described by `config`.
    pub async fn bind(config: Config) -> Result<Self> {
        let ctx = initialization::setup(config).await?;
        Ok(Self {
            event_loop: EventLoop::new(ctx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.event_loop.local_addr()
    }

    /// Runs the event loop until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> RelayStats
    where
        F: Future<Output = ()>,
    {
        self.event_loop.run(shutdown).await
    }
}

/// The main server startup function: bind, then loop until SIGINT or SIGTERM.
pub async fn run(config: Config) -> Result<()> {
    let relay = Relay::bind(config).await?;

    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow!("Failed to register SIGINT handler: {}", e))?;
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow!("Failed to register SIGTERM handler: {}", e))?;
    let shutdown = async move {
        tokio::select! {
            _ = sigint.recv() => info!("SIGINT received, shutting down."),
            _ = sigterm.recv() => info!("SIGTERM received, shutting down."),
        }
    };

    relay.run_until(shutdown).await;
    Ok(())
}
