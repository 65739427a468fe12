//! Protocol error types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid payload length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Unknown property id: {0}")]
    UnknownProperty(u32),

    #[error("Name length {actual} exceeds maximum of {max} bytes")]
    NameTooLong { max: usize, actual: usize },

    #[error("Index {index} out of range for {kind} (max {max})")]
    IndexOutOfRange {
        kind: &'static str,
        index: u8,
        max: u8,
    },
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
