// src/config.rs

//! Manages relay configuration: defaults, command-line overrides, optional TOML
//! file loading, and validation.

use crate::core::protocol::QuitMatch;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    4024
}
fn default_idle_timeout() -> Duration {
    Duration::from_secs(10)
}
fn default_tick_interval() -> Duration {
    Duration::from_secs(1)
}
fn default_read_chunk_bytes() -> usize {
    2048
}
fn default_max_line_bytes() -> usize {
    64 * 1024
}
fn default_log_level() -> String {
    "info".to_string()
}

/// The resolved relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// IPv4 address of the passive socket, in dotted-quad form.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port of the passive socket. `0` asks the OS for an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// How long a client may go without completing a line before it is dropped.
    #[serde(default = "default_idle_timeout", with = "humantime_serde")]
    pub idle_timeout: Duration,
    /// Upper bound on the readiness wait, i.e. the loop's clock tick.
    #[serde(default = "default_tick_interval", with = "humantime_serde")]
    pub tick_interval: Duration,
    /// Maximum number of bytes taken from a socket in a single read event.
    #[serde(default = "default_read_chunk_bytes")]
    pub read_chunk_bytes: usize,
    /// Maximum size of a partial line held for a connection.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    #[serde(default)]
    pub quit_match: QuitMatch,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            idle_timeout: default_idle_timeout(),
            tick_interval: default_tick_interval(),
            read_chunk_bytes: default_read_chunk_bytes(),
            max_line_bytes: default_max_line_bytes(),
            quit_match: QuitMatch::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML from '{path}'"))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a configuration from command-line arguments (program name excluded).
    ///
    /// Accepted form: `[ip_address] [port] [--config path.toml]`. Positional values
    /// override anything loaded from the file.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut config_path = None;
        let mut positionals = Vec::new();

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" => {
                    let path = iter
                        .next()
                        .ok_or_else(|| anyhow!("--config flag requires a value"))?;
                    config_path = Some(path.as_str());
                }
                flag if flag.starts_with("--") => {
                    return Err(anyhow!("unknown flag '{flag}'"));
                }
                value => positionals.push(value),
            }
        }

        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        match positionals.as_slice() {
            [] => {}
            [host] => config.host = host.to_string(),
            [host, port] => {
                config.host = host.to_string();
                config.port = parse_port(port)?;
            }
            _ => return Err(anyhow!("too many arguments")),
        }

        config.validate()?;
        Ok(config)
    }

    /// The socket address the passive socket binds to.
    pub fn bind_addr(&self) -> Result<SocketAddrV4> {
        let ip: Ipv4Addr = self
            .host
            .parse()
            .with_context(|| format!("'{}' is not a valid IPv4 address", self.host))?;
        Ok(SocketAddrV4::new(ip, self.port))
    }

    /// Validates the resolved configuration.
    pub fn validate(&self) -> Result<()> {
        if !is_dotted_quad(&self.host) {
            return Err(anyhow!(
                "host '{}' must be a dotted-quad IPv4 address",
                self.host
            ));
        }
        self.bind_addr()?;
        if self.idle_timeout.is_zero() {
            return Err(anyhow!("idle_timeout cannot be 0"));
        }
        if self.tick_interval.is_zero() {
            return Err(anyhow!("tick_interval cannot be 0"));
        }
        if self.read_chunk_bytes == 0 {
            return Err(anyhow!("read_chunk_bytes cannot be 0"));
        }
        if self.max_line_bytes == 0 {
            return Err(anyhow!("max_line_bytes cannot be 0"));
        }
        Ok(())
    }
}

/// Four dot-separated groups of one to three ASCII digits.
fn is_dotted_quad(s: &str) -> bool {
    let groups: Vec<&str> = s.split('.').collect();
    groups.len() == 4
        && groups
            .iter()
            .all(|g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()))
}

fn parse_port(s: &str) -> Result<u16> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(anyhow!("port '{s}' must be a non-negative integer"));
    }
    s.parse::<u16>()
        .with_context(|| format!("port '{s}' is out of range"))
}
