//! Session state guarded by the manager's mutex

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anp_core::{AnpError, PowerState};

use crate::callback::CallbackEntry;
use crate::correlator::Correlator;
use crate::id::IdGenerator;
use crate::mailbox::Mailbox;
use crate::registry::Registry;

/// Lifecycle of a manager instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Uninitialized,
    Initializing,
    Running,
    ShuttingDown,
}

impl fmt::Display for ManagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerState::Uninitialized => write!(f, "uninitialized"),
            ManagerState::Initializing => write!(f, "initializing"),
            ManagerState::Running => write!(f, "running"),
            ManagerState::ShuttingDown => write!(f, "shutting down"),
        }
    }
}

/// Generation of the running session, 0 when none is running
///
/// Written only with the session mutex held, read without it. Work queued
/// by one session carries its generation and is dropped once that
/// generation is no longer live.
#[derive(Debug, Default)]
pub(crate) struct LiveSession(AtomicU64);

impl LiveSession {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn is(&self, generation: u64) -> bool {
        generation != 0 && self.current() == generation
    }

    pub fn is_running(&self) -> bool {
        self.current() != 0
    }

    pub fn set(&self, generation: u64) {
        self.0.store(generation, Ordering::Release);
    }

    pub fn clear(&self) {
        self.set(0);
    }
}

/// Everything the session mutex protects
pub(crate) struct SessionState {
    pub lifecycle: ManagerState,
    /// Local-module (server role) event subscribers
    pub server_callbacks: Registry<CallbackEntry>,
    /// Consumers of the client role
    pub client_callbacks: Registry<CallbackEntry>,
    pub transactions: Correlator,
    pub callback_ids: IdGenerator,
    /// Registration ID the platform server gave our client role; 0 if none
    pub server_callback_id: u32,
    pub peer_events_registered: bool,
    pub power_state: PowerState,
    pub mailbox: Option<Arc<Mailbox>>,
    /// Generation handed to the most recent start attempt; survives `reset`
    pub generation: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            lifecycle: ManagerState::Uninitialized,
            server_callbacks: Registry::new(),
            client_callbacks: Registry::new(),
            transactions: Correlator::new(),
            callback_ids: IdGenerator::new(),
            server_callback_id: 0,
            peer_events_registered: false,
            power_state: PowerState::Off,
            mailbox: None,
            generation: 0,
        }
    }

    /// Claim the generation for a new session
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Fail with `NotInitialized` unless running
    pub fn ensure_running(&self) -> Result<(), AnpError> {
        if self.lifecycle == ManagerState::Running {
            Ok(())
        } else {
            Err(AnpError::NotInitialized)
        }
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == ManagerState::Running
    }

    /// Forget every registration after the platform server dropped us
    pub fn clear_registrations(&mut self) {
        self.server_callbacks.remove_all();
        self.client_callbacks.remove_all();
        self.transactions.clear();
        self.peer_events_registered = false;
        self.server_callback_id = 0;
    }

    /// Return to the freshly constructed state
    pub fn reset(&mut self) {
        self.clear_registrations();
        self.transactions.reset();
        self.callback_ids.reset();
        self.power_state = PowerState::Off;
        self.mailbox = None;
        self.lifecycle = ManagerState::Uninitialized;
    }
}
