//! Error types for BugComm protocol operations
//!
//! Nothing in the protocol core is fatal. Validation failures are recovered
//! locally (discard, or answer with an Error response once paired) and
//! transport failures are logged and the operation abandoned.
use thiserror::Error;

use crate::contracts::PeerAddress;

/// Result type alias for BugComm operations
pub type Result<T> = std::result::Result<T, BugCommError>;

/// Reason a received buffer was rejected by the packet codec
///
/// The codec surfaces the exact reason for diagnostics; callers that only
/// need a yes/no answer use [`crate::codec::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Buffer length does not match the expected packet kind
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Signature field does not match the protocol constant
    #[error("signature mismatch: expected {expected:#010x}, got {actual:#010x}")]
    SignatureMismatch { expected: u32, actual: u32 },

    /// Version field does not match the protocol constant
    #[error("version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u8, actual: u8 },
}

/// Failures reported by the radio transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Transport used before `initialize`
    #[error("transport not initialized")]
    NotInitialized,

    /// Destination is not in the local peer table
    #[error("peer {0} not registered")]
    PeerNotFound(PeerAddress),

    /// Peer is already in the local peer table
    #[error("peer {0} already registered")]
    PeerExists(PeerAddress),

    /// Datagram exceeds the link MTU
    #[error("payload of {len} bytes exceeds link limit of {max}")]
    PayloadTooLarge { len: usize, max: usize },

    /// Station is not attached to the medium
    #[error("station {0} unreachable")]
    Unreachable(PeerAddress),
}

/// Top-level error for link operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BugCommError {
    #[error("invalid packet: {0}")]
    Validation(#[from] ValidationError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Radio channel outside 1..=14
    #[error("invalid channel {0}: must be within 1..=14")]
    InvalidChannel(u8),

    /// Operation requires a paired peer
    #[error("no peer paired")]
    NotPaired,

    /// Pairing wait aborted by the halt switch
    #[error("halted before pairing completed")]
    Halted,
}
