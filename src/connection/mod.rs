// src/connection/mod.rs

//! Client connection bookkeeping: the registry that owns every socket and the
//! framer that turns raw reads into lines.

mod framer;
mod registry;

pub use framer::{LineFramer, ReadOutcome};
pub use registry::{CloseReason, ConnId, ConnectionRegistry, Outbound};
