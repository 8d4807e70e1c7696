// src/core/chatter.rs

//! The per-tick record of what each connection produced during the read phase.

use crate::connection::ConnId;
use crate::core::protocol::{ARRIVAL_MARKER, DEPARTURE_MARKER};
use bytes::Bytes;
use indexmap::IndexMap;

/// One connection's contribution to a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chatter {
    /// The connection was accepted this tick.
    Arrived,
    /// The connection sent the quit command this tick.
    Departed,
    /// A completed, trimmed, non-empty line.
    Line(Bytes),
    /// A completed line that was empty after trimming. Requests a liveness
    /// probe write to the sender and is not broadcast.
    Probe,
}

impl Chatter {
    /// The text other connections see, or `None` for a probe.
    pub fn text(&self) -> Option<&[u8]> {
        match self {
            Chatter::Arrived => Some(ARRIVAL_MARKER),
            Chatter::Departed => Some(DEPARTURE_MARKER),
            Chatter::Line(text) => Some(&text[..]),
            Chatter::Probe => None,
        }
    }
}

/// Chatter for one tick, in insertion order.
pub type ChatterMap = IndexMap<ConnId, Chatter>;
