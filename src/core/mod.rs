// src/core/mod.rs

//! The relay's per-tick logic: chatter, broadcast fanout, and idle eviction.

pub mod chatter;
pub mod errors;
pub mod protocol;
pub mod router;
pub mod stats;
pub mod sweeper;

pub use chatter::{Chatter, ChatterMap};
pub use errors::RelayError;
pub use router::{BroadcastRouter, RouteSummary};
pub use stats::RelayStats;
pub use sweeper::TimeoutSweeper;
