//! MIDI transport capability
//!
//! The core only needs to list ports, send raw buffers, and receive raw
//! buffers. `midir_backend` provides the real implementation; tests use
//! in-memory stand-ins.

pub mod midir_backend;

use crate::error::TransportError;

pub use midir_backend::{MidirConnection, MidirTransport};

/// Capacity of the inbound byte-buffer channel
pub const INBOUND_CHANNEL_CAPACITY: usize = 1000;

/// Information about a MIDI port
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortInfo {
    pub index: usize,
    pub name: String,
}

impl PortInfo {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }
}

/// Enumerates the ports a backend currently exposes
pub trait PortLister {
    fn input_ports(&self) -> Result<Vec<PortInfo>, TransportError>;
    fn output_ports(&self) -> Result<Vec<PortInfo>, TransportError>;
}

/// Fire-and-forget byte sink bound to one output port
pub trait MidiSink {
    fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Display name of the port, used for logging
    fn port_name(&self) -> &str;
}
