//! anp-manager: Alert Notification Profile session manager
//!
//! Sits between local modules and the platform's ANP server. Local modules
//! subscribe as the server role (connection and category-change events) or
//! consume the client role (requests against remote alert servers and the
//! notifications they push). The manager tracks both sets of callbacks,
//! correlates asynchronous request completions back to the caller that made
//! them, and delivers events from a dedicated dispatch thread.

pub mod callback;
pub mod correlator;
pub mod dispatcher;
pub mod events;
pub mod id;
pub mod mailbox;
pub mod manager;
pub mod peer;
pub mod registry;
mod router;
pub mod state;

pub use callback::EventCallback;
pub use events::AnpEvent;
pub use manager::AnpManager;
pub use state::ManagerState;

pub use anp_core::{
    AnpError, CallbackId, DevicePowerEvent, ManagerConfig, MessageTransport, PowerState,
    PowerStateSource, RequestOutcome, TransactionId,
};
pub use anp_protocol::{BdAddr, Category, CategoryMask, ConnectionType};
