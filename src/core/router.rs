// src/core/router.rs

//! Fans each tick's chatter out to every connection except its author.

use crate::connection::{CloseReason, ConnId, ConnectionRegistry, Outbound};
use crate::core::RelayError;
use crate::core::chatter::{Chatter, ChatterMap};
use crate::core::protocol::{PROBE_BYTE, encode_line, welcome_message};
use bytes::BytesMut;
use tracing::debug;

/// What one routing pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RouteSummary {
    /// Recipients that were written a non-empty broadcast buffer.
    pub deliveries: usize,
    /// Connections closed because a probe or broadcast write failed.
    pub closed: usize,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BroadcastRouter;

impl BroadcastRouter {
    pub fn new() -> Self {
        Self
    }

    /// Writes the welcome to a newly registered connection, then records its
    /// arrival. A connection that does not take the whole welcome is closed and
    /// no arrival is recorded. Returns whether the connection is still open.
    pub fn greet<S: Outbound>(
        &self,
        registry: &mut ConnectionRegistry<S>,
        id: ConnId,
        chatter: &mut ChatterMap,
    ) -> bool {
        let welcome = welcome_message(id, registry.idle_timeout());
        let expected = welcome.len();
        let sent = registry.send(id, welcome.as_bytes()).and_then(|written| {
            if written < expected {
                Err(RelayError::ShortWrite { written, expected })
            } else {
                Ok(())
            }
        });
        match sent {
            Ok(()) => {
                chatter.insert(id, Chatter::Arrived);
                true
            }
            Err(e) => {
                registry.close(id, CloseReason::WriteFailed(e));
                false
            }
        }
    }

    /// Writes this tick's chatter to every registered connection.
    ///
    /// A connection whose own entry is `Probe` is first written a single NUL
    /// byte. A failed write closes that connection immediately and routing
    /// continues with the rest.
    pub fn route<S: Outbound>(
        &self,
        registry: &mut ConnectionRegistry<S>,
        chatter: &ChatterMap,
    ) -> RouteSummary {
        let mut summary = RouteSummary::default();
        if chatter.is_empty() {
            return summary;
        }

        for id in registry.ids() {
            if matches!(chatter.get(&id), Some(Chatter::Probe)) {
                debug!("Probing user{} for a broken connection", id);
                if let Err(e) = registry.send(id, PROBE_BYTE) {
                    registry.close(id, CloseReason::WriteFailed(e));
                    summary.closed += 1;
                    continue;
                }
            }

            let buffer = Self::compose(id, chatter);
            if buffer.is_empty() {
                continue;
            }
            match registry.send(id, &buffer) {
                Ok(_) => summary.deliveries += 1,
                Err(e) => {
                    registry.close(id, CloseReason::WriteFailed(e));
                    summary.closed += 1;
                }
            }
        }
        summary
    }

    /// The bytes `recipient` should see: one line per other author with text.
    pub fn compose(recipient: ConnId, chatter: &ChatterMap) -> BytesMut {
        let mut buffer = BytesMut::new();
        for (author, entry) in chatter {
            if *author == recipient {
                continue;
            }
            if let Some(text) = entry.text() {
                encode_line(&mut buffer, *author, text);
            }
        }
        buffer
    }
}
