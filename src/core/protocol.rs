// src/core/protocol.rs

//! Wire-level constants and formatting for the plain-text chat protocol.

use crate::connection::ConnId;
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Terminator appended to every line the relay writes.
pub const LINE_ENDING: &[u8] = b"\r\n";
/// Terminator that completes a line on input.
pub const INPUT_TERMINATOR: u8 = b'\n';
/// Single low-value byte written to surface a broken peer.
pub const PROBE_BYTE: &[u8] = b"\0";
pub const ARRIVAL_MARKER: &[u8] = b"<arrives>";
pub const DEPARTURE_MARKER: &[u8] = b"<quits>";
pub const QUIT_TOKEN: &[u8] = b"quit";

/// How a completed line is recognised as the quit command.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuitMatch {
    /// Any line containing `quit` (case-insensitive) ends the session,
    /// so `quit worrying` quits too.
    #[default]
    Contains,
    /// Only a line that is exactly `quit` once surrounding whitespace is removed.
    Exact,
}

impl QuitMatch {
    /// Returns true if `line` is a quit request under this policy.
    pub fn is_quit(self, line: &[u8]) -> bool {
        let trimmed = line.trim_ascii();
        match self {
            QuitMatch::Exact => trimmed.eq_ignore_ascii_case(QUIT_TOKEN),
            QuitMatch::Contains => trimmed
                .windows(QUIT_TOKEN.len())
                .any(|w| w.eq_ignore_ascii_case(QUIT_TOKEN)),
        }
    }
}

/// Appends `user<id>: <text>\r\n` to `dst`.
pub fn encode_line(dst: &mut BytesMut, id: ConnId, text: &[u8]) {
    dst.extend_from_slice(format!("user{id}: ").as_bytes());
    dst.extend_from_slice(text);
    dst.extend_from_slice(LINE_ENDING);
}

/// The greeting written once to a newly accepted connection.
pub fn welcome_message(id: ConnId, idle_timeout: Duration) -> String {
    format!(
        "Welcome user{id}.\r\n\
         This is a chat server\r\n\
         What you type will be seen by other connected clients.\r\n\
         Clients are timed out after being idle for {} seconds.\r\n\
         To quit, type 'quit'.\r\n",
        idle_timeout.as_secs_f64()
    )
}
