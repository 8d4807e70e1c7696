// src/main.rs

//! The main entry point for the chatrelay server application.

use anyhow::Result;
use chatrelay::config::Config;
use chatrelay::{VERSION, server};
use std::env;
use tracing::error;
use tracing_subscriber::filter::EnvFilter;

const USAGE: &str = "Usage: chatrelay [ip_address] [port] [--config /path/to/chatrelay.toml]";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Skip the program name.
    let args: Vec<String> = env::args().skip(1).collect();

    if args.iter().any(|arg| arg == "--version") {
        println!("chatrelay version {VERSION}");
        return Ok(());
    }
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("{USAGE}");
        return Ok(());
    }

    // An invalid address or port is reported before anything is bound.
    let config = match Config::from_args(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e:#}");
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    };

    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .compact()
        .with_ansi(true)
        .init();

    if let Err(e) = server::run(config).await {
        error!("Server runtime error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
