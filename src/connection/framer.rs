// src/connection/framer.rs

//! Reassembles newline-terminated lines from arbitrarily chunked reads.

use super::registry::{ConnId, ConnectionRegistry};
use crate::config::Config;
use crate::core::RelayError;
use crate::core::protocol::{INPUT_TERMINATOR, QuitMatch};
use bytes::Bytes;
use std::time::Instant;

/// The result of feeding one read event to the framer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The read returned zero bytes: the peer half-closed.
    Eof,
    /// The data so far does not end in a terminator; it is held as pending.
    Incomplete,
    /// The completed line is a quit request.
    QuitRequested,
    /// A completed line with trailing whitespace removed. May be empty.
    Line(Bytes),
}

/// Turns read events into at most one line each, using the registry's
/// per-connection pending buffer.
#[derive(Debug, Clone, Copy)]
pub struct LineFramer {
    max_line_bytes: usize,
    quit_match: QuitMatch,
}

impl LineFramer {
    pub fn new(max_line_bytes: usize, quit_match: QuitMatch) -> Self {
        Self {
            max_line_bytes,
            quit_match,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_line_bytes, config.quit_match)
    }

    /// Processes `chunk`, the bytes from a single read on `id`.
    ///
    /// The pending buffer is cleared whenever a terminator completes the line,
    /// and the deadline is refreshed only when that line is not a quit.
    /// Everything up to the final terminator is one line, so a chunk carrying
    /// several newlines still produces a single emission.
    pub fn on_read<S>(
        &self,
        registry: &mut ConnectionRegistry<S>,
        id: ConnId,
        chunk: &[u8],
        now: Instant,
    ) -> Result<ReadOutcome, RelayError> {
        if chunk.is_empty() {
            return Ok(ReadOutcome::Eof);
        }

        let mut line = registry.take_pending(id)?;
        line.extend_from_slice(chunk);

        if line.last() != Some(&INPUT_TERMINATOR) {
            if line.len() > self.max_line_bytes {
                return Err(RelayError::LineTooLong {
                    limit: self.max_line_bytes,
                });
            }
            registry.set_pending(id, line)?;
            return Ok(ReadOutcome::Incomplete);
        }

        if self.quit_match.is_quit(&line) {
            return Ok(ReadOutcome::QuitRequested);
        }

        let trimmed_len = line.trim_ascii_end().len();
        line.truncate(trimmed_len);
        registry.reset_expiration(id, now)?;
        Ok(ReadOutcome::Line(line.freeze()))
    }
}
