//! Protocol error types

use thiserror::Error;

/// Errors that can occur while encoding or decoding ANP messages
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Payload exceeds maximum size
    #[error("Payload too large: {size} bytes exceeds maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// Payload is shorter than the fixed fields of its record
    #[error("Truncated payload for function {function:#010x}: need {expected} bytes, got {actual}")]
    Truncated {
        function: u32,
        expected: usize,
        actual: usize,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
