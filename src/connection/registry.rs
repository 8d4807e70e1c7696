// src/connection/registry.rs

//! Defines `ConnectionRegistry`, the single owner of every active client socket
//! together with its idle deadline and partial-read buffer.

use crate::core::RelayError;
use bytes::BytesMut;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Identity of a connection, taken from its socket's file descriptor. The OS
/// never hands out the same descriptor to two open sockets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(RawFd);

impl ConnId {
    pub const fn new(raw: RawFd) -> Self {
        Self(raw)
    }

    /// Derives the id from an open socket.
    pub fn of<S: AsRawFd>(socket: &S) -> Self {
        Self(socket.as_raw_fd())
    }

    pub fn as_raw(self) -> RawFd {
        self.0
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The write half the relay needs from a client socket.
///
/// Writes never block: a full send buffer surfaces as `WouldBlock`.
pub trait Outbound {
    fn try_send(&self, buf: &[u8]) -> io::Result<usize>;
}

impl Outbound for TcpStream {
    fn try_send(&self, buf: &[u8]) -> io::Result<usize> {
        self.try_write(buf)
    }
}

/// Why a connection moved to `Closed`.
#[derive(Debug)]
pub enum CloseReason {
    /// The client sent the quit command.
    Quit,
    /// A read returned zero bytes.
    Hangup,
    /// No line was completed before the deadline.
    TimedOut,
    /// A read failed.
    ReadFailed(RelayError),
    /// A write failed.
    WriteFailed(RelayError),
    /// The client's partial line outgrew the limit.
    Framing(RelayError),
    /// The relay is shutting down.
    Shutdown,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Quit => write!(f, "quit peacefully"),
            CloseReason::Hangup => write!(f, "has no more data to read"),
            CloseReason::TimedOut => write!(f, "timed out"),
            CloseReason::ReadFailed(e) => write!(f, "read failed: {e}"),
            CloseReason::WriteFailed(e) => write!(f, "write failed: {e}"),
            CloseReason::Framing(e) => write!(f, "framing error: {e}"),
            CloseReason::Shutdown => write!(f, "relay shutting down"),
        }
    }
}

/// One registered client link.
#[derive(Debug)]
struct Connection<S> {
    stream: S,
    expires_at: Instant,
    /// Bytes received since the last terminator. Empty when nothing is held.
    pending: BytesMut,
}

/// Maps connection ids to their socket, deadline, and pending buffer.
///
/// The passive socket is not stored here; the event loop holds it separately,
/// so every entry is a client connection.
#[derive(Debug)]
pub struct ConnectionRegistry<S> {
    connections: HashMap<ConnId, Connection<S>>,
    idle_timeout: Duration,
}

impl<S> ConnectionRegistry<S> {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            connections: HashMap::new(),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Registers a new connection with a fresh deadline of `now + idle_timeout`.
    pub fn register(&mut self, id: ConnId, stream: S, now: Instant) -> Result<(), RelayError> {
        if self.connections.contains_key(&id) {
            return Err(RelayError::DuplicateConnection(id));
        }
        self.connections.insert(
            id,
            Connection {
                stream,
                expires_at: now + self.idle_timeout,
                pending: BytesMut::new(),
            },
        );
        Ok(())
    }

    /// Removes every entry for `id` and hands back the socket. Calling it for an
    /// absent id is a no-op.
    pub fn unregister(&mut self, id: ConnId) -> Option<S> {
        self.connections.remove(&id).map(|conn| conn.stream)
    }

    /// Tears a connection down: purges its entries, then releases the socket.
    /// Returns false if the id was not registered.
    pub fn close(&mut self, id: ConnId, reason: CloseReason) -> bool {
        let Some(stream) = self.unregister(id) else {
            debug!("close({}) ignored: connection already gone", id);
            return false;
        };
        match &reason {
            CloseReason::ReadFailed(e) | CloseReason::WriteFailed(e) | CloseReason::Framing(e)
                if !e.is_broken_connection() =>
            {
                warn!("user{} {}", id, reason)
            }
            _ => info!("user{} {}", id, reason),
        }
        drop(stream);
        true
    }

    pub fn contains(&self, id: ConnId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// A snapshot of all active ids, in ascending order.
    pub fn ids(&self) -> Vec<ConnId> {
        let mut ids: Vec<ConnId> = self.connections.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn stream(&self, id: ConnId) -> Option<&S> {
        self.connections.get(&id).map(|conn| &conn.stream)
    }

    pub fn streams(&self) -> impl Iterator<Item = (ConnId, &S)> {
        self.connections.iter().map(|(id, conn)| (*id, &conn.stream))
    }

    pub fn expiration(&self, id: ConnId) -> Option<Instant> {
        self.connections.get(&id).map(|conn| conn.expires_at)
    }

    pub fn set_expiration(&mut self, id: ConnId, deadline: Instant) -> Result<(), RelayError> {
        self.entry_mut(id)?.expires_at = deadline;
        Ok(())
    }

    /// Pushes the deadline out to `now + idle_timeout`.
    pub fn reset_expiration(&mut self, id: ConnId, now: Instant) -> Result<(), RelayError> {
        let deadline = now + self.idle_timeout;
        self.set_expiration(id, deadline)
    }

    /// Ids whose deadline is at or before `now`.
    pub fn expired(&self, now: Instant) -> Vec<ConnId> {
        let mut ids: Vec<ConnId> = self
            .connections
            .iter()
            .filter(|(_, conn)| conn.expires_at <= now)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// The partial line held for `id`, if any.
    pub fn pending(&self, id: ConnId) -> Option<&[u8]> {
        self.connections
            .get(&id)
            .map(|conn| &conn.pending[..])
            .filter(|pending| !pending.is_empty())
    }

    pub fn set_pending(&mut self, id: ConnId, bytes: BytesMut) -> Result<(), RelayError> {
        self.entry_mut(id)?.pending = bytes;
        Ok(())
    }

    pub fn clear_pending(&mut self, id: ConnId) -> Result<(), RelayError> {
        self.entry_mut(id)?.pending.clear();
        Ok(())
    }

    /// Removes and returns the partial line, leaving none held.
    pub fn take_pending(&mut self, id: ConnId) -> Result<BytesMut, RelayError> {
        Ok(std::mem::take(&mut self.entry_mut(id)?.pending))
    }

    /// Removes every connection, handing back the sockets.
    pub fn drain(&mut self) -> Vec<(ConnId, S)> {
        self.connections
            .drain()
            .map(|(id, conn)| (id, conn.stream))
            .collect()
    }

    fn entry_mut(&mut self, id: ConnId) -> Result<&mut Connection<S>, RelayError> {
        self.connections
            .get_mut(&id)
            .ok_or(RelayError::UnknownConnection(id))
    }
}

impl ConnectionRegistry<TcpStream> {
    /// Registers a freshly accepted socket once it reports write readiness.
    ///
    /// A new socket has no cached readiness until the runtime has polled it, and
    /// `try_write` fails with `WouldBlock` before then without reaching the kernel.
    pub async fn admit(
        &mut self,
        stream: TcpStream,
        now: Instant,
        within: Duration,
    ) -> Result<ConnId, RelayError> {
        let ready = tokio::time::timeout(within, stream.writable()).await;
        match ready {
            Ok(writable) => writable?,
            Err(_) => return Err(RelayError::NotWritable { within }),
        }
        let id = ConnId::of(&stream);
        self.register(id, stream, now)?;
        Ok(id)
    }
}

impl<S: Outbound> ConnectionRegistry<S> {
    /// Writes `buf` to `id` without blocking.
    ///
    /// Returns the number of bytes accepted by the socket. If the socket stops
    /// accepting data partway, the rest is dropped. Any other failure is
    /// returned so the caller can close the connection on the spot.
    pub fn send(&self, id: ConnId, buf: &[u8]) -> Result<usize, RelayError> {
        let stream = self.stream(id).ok_or(RelayError::UnknownConnection(id))?;
        let mut written = 0;
        while written < buf.len() {
            match stream.try_send(&buf[written..]) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero).into()),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    debug!(
                        "user{} is not ready for writing; dropped {} bytes",
                        id,
                        buf.len() - written
                    );
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(written)
    }
}
