//! Error types for the V49 editor core
//!
//! Each component reports its own error enum so callers can match on the
//! exact failure. `SessionError` wraps all of them for the orchestration
//! layer; binaries use `anyhow` on top.

use thiserror::Error;

/// Malformed or unrecognized SysEx frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Buffer does not carry the Alesis maker/product identity
    #[error("not an Alesis V49 SysEx message")]
    NotVendorEnvelope,

    /// Envelope carries a command byte this protocol does not define
    #[error("unknown command: 0x{0:02X}")]
    UnknownCommand(u8),

    /// SET payload does not match the codec's fixed length
    #[error("SET payload must be {expected} bytes, got {actual}")]
    PayloadLength { expected: usize, actual: usize },
}

/// Payload that cannot be turned into a valid configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("{field} out of range: {value}")]
    OutOfRange { field: String, value: u8 },

    #[error("invalid {field}: 0x{value:02X}")]
    InvalidMode { field: String, value: u8 },
}

/// Discovery found nothing usable
///
/// Pairing itself never fails; this is only raised by callers that require
/// a device to be present.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("no device matching '{marker}' found. Please connect the controller via USB")]
    NoDevice { marker: String },
}

/// Invalid mutation of the live state store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("configuration not initialized")]
    Uninitialized,

    #[error("{entity} index out of range: {index} (must be below {len})")]
    IndexOutOfRange {
        entity: &'static str,
        index: usize,
        len: usize,
    },

    /// Merged value would not survive an encode
    #[error("rejected update: {0}")]
    Invalid(#[from] CodecError),
}

/// Failure in the MIDI transport capability
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("MIDI backend initialisation failed: {0}")]
    Init(String),

    #[error("port '{0}' not found")]
    PortNotFound(String),

    #[error("failed to connect to '{port}': {reason}")]
    Connect { port: String, reason: String },

    #[error("failed to send {len} bytes: {reason}")]
    Send { len: usize, reason: String },
}

/// Any failure surfaced while driving an editor session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
