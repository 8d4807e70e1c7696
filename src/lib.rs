// src/lib.rs

pub mod config;
pub mod connection;
pub mod core;
pub mod server;

pub use crate::server::Relay;

/// The version stamped at build time.
pub const VERSION: &str = env!("CHATRELAY_BUILD_VERSION");
