// src/core/sweeper.rs

//! Evicts connections whose idle deadline has passed.

use crate::connection::{CloseReason, ConnId, ConnectionRegistry};
use std::time::Instant;

pub struct TimeoutSweeper;

impl TimeoutSweeper {
    /// Closes every connection whose deadline is at or before `now` and
    /// returns their ids.
    pub fn sweep<S>(registry: &mut ConnectionRegistry<S>, now: Instant) -> Vec<ConnId> {
        let expired = registry.expired(now);
        for &id in &expired {
            registry.close(id, CloseReason::TimedOut);
        }
        expired
    }
}
