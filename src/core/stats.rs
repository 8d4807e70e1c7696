// src/core/stats.rs

//! Counters describing what the relay has done since startup.

/// Relay-wide statistics. Only the loop thread touches these.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    /// Connections accepted and registered.
    pub connections_accepted: u64,
    /// Non-empty lines recorded as chatter.
    pub lines_relayed: u64,
    /// Connections that ended with the quit command.
    pub quits: u64,
    /// Connections closed after a zero-length read.
    pub hangups: u64,
    /// Connections evicted by the idle sweep.
    pub timeouts: u64,
    /// Connections closed because a read or write failed.
    pub failures: u64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total connections closed for any reason.
    pub fn connections_closed(&self) -> u64 {
        self.quits + self.hangups + self.timeouts + self.failures
    }
}
