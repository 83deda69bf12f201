use thiserror::Error;

use crate::runtime::host::SexpType;

/// Control-flow signal raised by the host while it was allocating.
///
/// The host abandoned the call; nothing it allocated during that call is
/// reachable from Rust.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("host runtime unwound: {reason}")]
    Unwind { reason: String },
}

/// Failures surfaced by the handle containers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VectorError {
    /// The wrapped object does not carry the tag the container expects.
    #[error("invalid input type, expected '{expected}' actual '{actual}'")]
    TypeMismatch {
        expected: SexpType,
        actual: SexpType,
    },
    /// A checked access fell outside `0..length`.
    #[error("index {index} out of range for {kind} of length {length}")]
    OutOfRange {
        kind: SexpType,
        index: usize,
        length: usize,
    },
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Failures while loading a [`HeapConfig`](crate::runtime::config::HeapConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid heap config: {0}")]
    Parse(#[from] serde_json::Error),
}
