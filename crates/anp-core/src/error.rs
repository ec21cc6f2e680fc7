//! Core error types for the ANP manager

use anp_protocol::ProtocolError;
use std::path::PathBuf;
use thiserror::Error;

/// Error returned by every public manager operation
#[derive(Error, Debug)]
pub enum AnpError {
    /// The manager is not running
    #[error("ANP manager not initialized")]
    NotInitialized,

    /// A caller-supplied argument was rejected
    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// No client callback with this ID is registered
    #[error("Unknown callback ID: {0}")]
    UnknownCallbackId(u32),

    /// A registry refused the new entry
    #[error("Unable to add entry")]
    UnableToAddEntry,

    /// The request could not be exchanged with the platform server
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A resource needed to start the manager could not be created
    #[error("Resource setup failed: {0}")]
    ResourceSetup(String),

    /// The request layer was already initialized
    #[error("Already initialized")]
    AlreadyInitialized,

    /// The platform server answered with a negative status
    #[error("Remote status {0}")]
    Remote(i32),
}

impl AnpError {
    /// Integer code for callers that speak the hosting framework's status
    /// convention (negative on failure)
    pub fn code(&self) -> i32 {
        match self {
            AnpError::NotInitialized => -1001,
            AnpError::InvalidParameter(_) => -1002,
            AnpError::UnknownCallbackId(_) => -1003,
            AnpError::UnableToAddEntry => -1004,
            AnpError::Transport(e) => e.code(),
            AnpError::ResourceSetup(_) => -1008,
            AnpError::AlreadyInitialized => -1009,
            AnpError::Remote(status) => *status,
        }
    }
}

/// Errors from the inter-process message transport
#[derive(Error, Debug)]
pub enum TransportError {
    /// No response arrived in time
    #[error("Timed out waiting for response")]
    Timeout,

    /// The request could not be sent
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The response was too short for its record
    #[error("Invalid response: expected at least {expected} bytes, got {actual}")]
    InvalidResponse { expected: usize, actual: usize },

    /// The group handler could not be (un)registered
    #[error("Handler registration failed: {0}")]
    HandlerRegistration(String),
}

impl TransportError {
    /// Integer code used by [`AnpError::code`]
    pub fn code(&self) -> i32 {
        match self {
            TransportError::Timeout => -1005,
            TransportError::SendFailed(_) | TransportError::HandlerRegistration(_) => -1006,
            TransportError::InvalidResponse { .. } => -1007,
        }
    }
}

impl From<ProtocolError> for TransportError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Truncated {
                expected, actual, ..
            } => TransportError::InvalidResponse { expected, actual },
            other => TransportError::SendFailed(other.to_string()),
        }
    }
}

impl From<ProtocolError> for AnpError {
    fn from(err: ProtocolError) -> Self {
        AnpError::Transport(err.into())
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_negative_and_distinct() {
        let errors = [
            AnpError::NotInitialized,
            AnpError::InvalidParameter("callback_id"),
            AnpError::UnknownCallbackId(3),
            AnpError::UnableToAddEntry,
            AnpError::Transport(TransportError::Timeout),
            AnpError::Transport(TransportError::SendFailed("closed".into())),
            AnpError::Transport(TransportError::InvalidResponse {
                expected: 4,
                actual: 0,
            }),
            AnpError::ResourceSetup("mailbox".into()),
            AnpError::AlreadyInitialized,
        ];
        let mut codes: Vec<i32> = errors.iter().map(AnpError::code).collect();
        assert!(codes.iter().all(|c| *c < 0));
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_remote_status_passes_through() {
        assert_eq!(AnpError::Remote(-42).code(), -42);
    }

    #[test]
    fn test_truncated_maps_to_invalid_response() {
        let err: TransportError = ProtocolError::Truncated {
            function: 0x1001,
            expected: 4,
            actual: 2,
        }
        .into();
        assert!(matches!(
            err,
            TransportError::InvalidResponse {
                expected: 4,
                actual: 2
            }
        ));
    }
}
