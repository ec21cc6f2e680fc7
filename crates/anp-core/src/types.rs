//! Core domain types

use std::fmt;

/// Identifier of a registered event callback (never 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(pub u32);

impl CallbackId {
    /// Create a new callback ID
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Locally assigned handle for an in-flight request (never 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u32);

impl TransactionId {
    /// Create a new transaction ID
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction ID assigned by the platform server
///
/// Lives in a different namespace from [`TransactionId`]; the two are never
/// compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerTransactionId(pub u32);

impl ServerTransactionId {
    /// Get the raw ID value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ServerTransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server:{}", self.0)
    }
}

/// Last known power state of the local Bluetooth device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    #[default]
    Off,
    On,
}

impl PowerState {
    /// Whether the device is powered
    pub fn is_on(&self) -> bool {
        matches!(self, PowerState::On)
    }
}

impl From<bool> for PowerState {
    fn from(on: bool) -> Self {
        if on {
            PowerState::On
        } else {
            PowerState::Off
        }
    }
}

/// Device manager events the ANP manager reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePowerEvent {
    PoweredOn,
    PoweringOff,
    PoweredOff,
}

/// Result of a client request that may complete asynchronously
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The server finished the request synchronously; no event will follow
    Completed,
    /// A completion event carrying this ID will be delivered later
    Pending(TransactionId),
}

impl RequestOutcome {
    /// Transaction ID of a pending request
    pub fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            RequestOutcome::Completed => None,
            RequestOutcome::Pending(id) => Some(*id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_state_from_bool() {
        assert_eq!(PowerState::from(true), PowerState::On);
        assert!(!PowerState::default().is_on());
    }

    #[test]
    fn test_request_outcome_transaction_id() {
        assert_eq!(RequestOutcome::Completed.transaction_id(), None);
        assert_eq!(
            RequestOutcome::Pending(TransactionId::new(7)).transaction_id(),
            Some(TransactionId::new(7))
        );
    }
}
