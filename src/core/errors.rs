// src/core/errors.rs

//! Defines the primary error type for connection-level failures.

use crate::connection::ConnId;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A local failure affecting a single connection. None of these stop the loop.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Line exceeds {limit} bytes without a terminator")]
    LineTooLong { limit: usize },

    #[error("Unknown connection {0}")]
    UnknownConnection(ConnId),

    #[error("Connection {0} is already registered")]
    DuplicateConnection(ConnId),

    #[error("Socket did not become writable within {within:?}")]
    NotWritable { within: Duration },

    #[error("Socket accepted {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
}

impl RelayError {
    /// True when the error means the peer is gone (reset, closed, or aborted).
    pub fn is_broken_connection(&self) -> bool {
        matches!(self, RelayError::Io(e) if matches!(
            e.kind(),
            std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::NotConnected
                | std::io::ErrorKind::UnexpectedEof
                | std::io::ErrorKind::WriteZero
        ))
    }
}

// `std::io::Error` is not cloneable, so it is shared through an Arc.
impl Clone for RelayError {
    fn clone(&self) -> Self {
        match self {
            RelayError::Io(e) => RelayError::Io(Arc::clone(e)),
            RelayError::LineTooLong { limit } => RelayError::LineTooLong { limit: *limit },
            RelayError::UnknownConnection(id) => RelayError::UnknownConnection(*id),
            RelayError::DuplicateConnection(id) => RelayError::DuplicateConnection(*id),
            RelayError::NotWritable { within } => RelayError::NotWritable { within: *within },
            RelayError::ShortWrite { written, expected } => RelayError::ShortWrite {
                written: *written,
                expected: *expected,
            },
        }
    }
}

impl From<std::io::Error> for RelayError {
    fn from(e: std::io::Error) -> Self {
        RelayError::Io(Arc::new(e))
    }
}
