// src/server/context.rs

use crate::config::Config;
use tokio::net::TcpListener;

/// Holds the initialized state required to run the event loop.
pub struct ServerContext {
    pub config: Config,
    /// The passive socket.
    pub listener: TcpListener,
}
