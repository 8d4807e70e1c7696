// src/server/event_loop.rs

//! The single-threaded loop that multiplexes the passive socket and every client.
//!
//! Each iteration:
//! 1. snapshots the registered ids,
//! 2. waits for the listener or any client to become readable, bounded by the tick,
//! 3. accepts at most one connection and reads once from each ready client,
//! 4. broadcasts the tick's chatter,
//! 5. sweeps idle connections.

use super::context::ServerContext;
use crate::config::Config;
use crate::connection::{CloseReason, ConnId, ConnectionRegistry, LineFramer, ReadOutcome};
use crate::core::{BroadcastRouter, Chatter, ChatterMap, RelayStats, TimeoutSweeper};
use futures::FutureExt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// What ended the readiness wait.
enum Wake {
    Shutdown,
    Accepted(io::Result<(TcpStream, SocketAddr)>),
    Readable,
    Tick,
}

pub struct EventLoop {
    listener: TcpListener,
    registry: ConnectionRegistry<TcpStream>,
    framer: LineFramer,
    router: BroadcastRouter,
    tick_interval: Duration,
    read_buf: Vec<u8>,
    stats: RelayStats,
}

impl EventLoop {
    pub(crate) fn new(ctx: ServerContext) -> Self {
        let ServerContext { config, listener } = ctx;
        Self::with_listener(listener, &config)
    }

    pub fn with_listener(listener: TcpListener, config: &Config) -> Self {
        Self {
            listener,
            registry: ConnectionRegistry::new(config.idle_timeout),
            framer: LineFramer::from_config(config),
            router: BroadcastRouter::new(),
            tick_interval: config.tick_interval,
            read_buf: vec![0; config.read_chunk_bytes],
            stats: RelayStats::new(),
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs until `shutdown` resolves, then drops every connection without
    /// draining and returns the final statistics.
    pub async fn run<F>(mut self, shutdown: F) -> RelayStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let snapshot = self.registry.ids();

            let wake = tokio::select! {
                biased;
                _ = &mut shutdown => Wake::Shutdown,
                res = self.listener.accept() => Wake::Accepted(res),
                res = wait_readable(&self.registry) => {
                    if let Err(e) = res {
                        debug!("Readiness wait reported an error: {}", e);
                    }
                    Wake::Readable
                }
                _ = tokio::time::sleep(self.tick_interval) => Wake::Tick,
            };

            let now = Instant::now();
            let mut chatter = ChatterMap::new();

            match wake {
                Wake::Shutdown => break,
                Wake::Accepted(Ok((stream, addr))) => {
                    self.on_accept(stream, addr, now, &mut chatter).await
                }
                Wake::Accepted(Err(e)) => error!("Failed to accept connection: {}", e),
                Wake::Readable | Wake::Tick => {}
            }

            self.read_ready(&snapshot, now, &mut chatter);

            let summary = self.router.route(&mut self.registry, &chatter);
            self.stats.failures += summary.closed as u64;

            let timed_out = TimeoutSweeper::sweep(&mut self.registry, Instant::now());
            self.stats.timeouts += timed_out.len() as u64;
        }

        self.shutdown()
    }

    async fn on_accept(
        &mut self,
        stream: TcpStream,
        addr: SocketAddr,
        now: Instant,
        chatter: &mut ChatterMap,
    ) {
        if let Err(e) = configure_client_socket(&stream) {
            warn!("Failed to configure socket for {}: {}", addr, e);
        }

        let id = match self.registry.admit(stream, now, self.tick_interval).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Dropped connection from {}: {}", addr, e);
                self.stats.failures += 1;
                return;
            }
        };
        info!("user{} has connected from {}", id, addr);
        self.stats.connections_accepted += 1;

        if !self.router.greet(&mut self.registry, id, chatter) {
            self.stats.failures += 1;
        }
    }

    /// Performs one non-blocking read on each snapshot connection that is
    /// still registered. `WouldBlock` means the socket was not ready.
    fn read_ready(&mut self, snapshot: &[ConnId], now: Instant, chatter: &mut ChatterMap) {
        for &id in snapshot {
            let result = match self.registry.stream(id) {
                Some(stream) => stream.try_read(&mut self.read_buf),
                None => continue,
            };

            let n = match result {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.registry.close(id, CloseReason::ReadFailed(e.into()));
                    self.stats.failures += 1;
                    continue;
                }
            };

            let outcome = self
                .framer
                .on_read(&mut self.registry, id, &self.read_buf[..n], now);
            match outcome {
                Ok(ReadOutcome::Eof) => {
                    self.registry.close(id, CloseReason::Hangup);
                    self.stats.hangups += 1;
                }
                Ok(ReadOutcome::Incomplete) => {}
                Ok(ReadOutcome::QuitRequested) => {
                    self.registry.close(id, CloseReason::Quit);
                    chatter.insert(id, Chatter::Departed);
                    self.stats.quits += 1;
                }
                Ok(ReadOutcome::Line(text)) if text.is_empty() => {
                    chatter.insert(id, Chatter::Probe);
                }
                Ok(ReadOutcome::Line(text)) => {
                    debug!("user{} says '{}'", id, String::from_utf8_lossy(&text));
                    chatter.insert(id, Chatter::Line(text));
                    self.stats.lines_relayed += 1;
                }
                Err(e) => {
                    self.registry.close(id, CloseReason::Framing(e));
                    self.stats.failures += 1;
                }
            }
        }
    }

    fn shutdown(mut self) -> RelayStats {
        let remaining = self.registry.drain();
        info!("Closing {} remaining connections.", remaining.len());
        for (id, stream) in remaining {
            debug!("user{} {}", id, CloseReason::Shutdown);
            drop(stream);
        }
        info!(
            "Relay stopped. accepted={} relayed={} quits={} hangups={} timeouts={} failures={}",
            self.stats.connections_accepted,
            self.stats.lines_relayed,
            self.stats.quits,
            self.stats.hangups,
            self.stats.timeouts,
            self.stats.failures
        );
        self.stats
    }
}

/// Resolves once any registered client is readable. Never resolves when there
/// are no clients, leaving the listener and the tick to end the wait.
async fn wait_readable(registry: &ConnectionRegistry<TcpStream>) -> io::Result<()> {
    if registry.is_empty() {
        return std::future::pending().await;
    }
    let waits = registry
        .streams()
        .map(|(_, stream)| stream.readable().boxed());
    let (result, _index, _remaining) = futures::future::select_all(waits).await;
    result
}

/// Client sockets close immediately, discarding unsent data.
#[allow(deprecated)]
fn configure_client_socket(stream: &TcpStream) -> io::Result<()> {
    stream.set_nodelay(true)?;
    stream.set_linger(Some(Duration::ZERO))
}
