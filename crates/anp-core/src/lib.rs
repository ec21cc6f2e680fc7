//! anp-core: Core abstractions and configuration for the ANP manager
//!
//! This crate provides the error taxonomy, identifier newtypes, configuration
//! structures, and the collaborator traits (message transport, device power
//! state) used by the manager.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::ManagerConfig;
pub use error::{AnpError, ConfigError, TransportError};
pub use traits::{GroupHandler, MessageTransport, PowerStateSource};
pub use types::{
    CallbackId, DevicePowerEvent, PowerState, RequestOutcome, ServerTransactionId, TransactionId,
};
