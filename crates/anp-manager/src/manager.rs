//! The ANP manager handle
//!
//! Owns the session state and drives its lifecycle:
//! `Uninitialized -> Initializing -> Running -> ShuttingDown -> Uninitialized`.
//!
//! # Locking
//!
//! `session` guards all mutable state and is never held across a request to
//! the platform server or while a callback runs. `peer_gate` serializes the
//! multi-step operations that span a remote call: client (un)registration,
//! and the begin / send / bind sequence of correlated requests, against the
//! router popping completions. Lock order is `peer_gate` then `session`.

use std::sync::Arc;

use parking_lot::Mutex;

use anp_core::{
    AnpError, CallbackId, DevicePowerEvent, ManagerConfig, MessageTransport, PowerState,
    PowerStateSource, RequestOutcome, ServerTransactionId,
};
use anp_protocol::{BdAddr, Category, NotificationType};

use crate::callback::{CallbackEntry, EntryFlags};
use crate::events::AnpEvent;
use crate::mailbox::Mailbox;
use crate::peer::PeerLink;
use crate::router;
use crate::state::{LiveSession, ManagerState, SessionState};

/// State shared by every handle and the dispatch thread
pub(crate) struct Shared {
    pub config: ManagerConfig,
    pub transport: Arc<dyn MessageTransport>,
    pub power_source: Arc<dyn PowerStateSource>,
    pub peer: PeerLink,
    pub session: Mutex<SessionState>,
    pub peer_gate: Mutex<()>,
    /// Generation of the running session; the router and dispatcher check
    /// it without the session lock
    pub live: LiveSession,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.session.get_mut();
        if let Some(mailbox) = state.mailbox.take() {
            self.transport
                .unregister_group_handler(self.config.message_group);
            mailbox.close();
        }
    }
}

/// Handle to an ANP manager instance
///
/// Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct AnpManager {
    shared: Arc<Shared>,
}

impl AnpManager {
    /// Create a manager bound to a transport and a power state source
    pub fn new(
        config: ManagerConfig,
        transport: Arc<dyn MessageTransport>,
        power_source: Arc<dyn PowerStateSource>,
    ) -> Self {
        let peer = PeerLink::new(Arc::clone(&transport), config.response_timeout);
        Self {
            shared: Arc::new(Shared {
                config,
                transport,
                power_source,
                peer,
                session: Mutex::new(SessionState::new()),
                peer_gate: Mutex::new(()),
                live: LiveSession::new(),
            }),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start the manager
    ///
    /// Opens the dispatch mailbox, registers it for the message group, and
    /// subscribes to ANP events at the platform server. Any failure undoes
    /// the steps already taken. Calling this while not uninitialized does
    /// nothing.
    pub fn initialize(&self) -> Result<(), AnpError> {
        {
            let mut state = self.shared.session.lock();
            if state.lifecycle != ManagerState::Uninitialized {
                tracing::info!("ANP manager is {}, ignoring initialize", state.lifecycle);
                return Ok(());
            }
            state.lifecycle = ManagerState::Initializing;
        }

        tracing::info!("Initializing ANP manager");
        match self.start() {
            Ok(()) => {
                tracing::info!("ANP manager running");
                Ok(())
            }
            Err(e) => {
                tracing::warn!("ANP manager failed to initialize: {}", e);
                self.shared.session.lock().reset();
                Err(e)
            }
        }
    }

    fn start(&self) -> Result<(), AnpError> {
        let shared = &self.shared;
        let group = shared.config.message_group;
        let generation = shared.session.lock().next_generation();

        let weak = Arc::downgrade(shared);
        let mailbox = Arc::new(Mailbox::open(
            group,
            &shared.config.dispatch_queue_name,
            move |item| {
                if let Some(shared) = weak.upgrade() {
                    router::handle_item(&shared, generation, item);
                }
            },
        )?);

        if let Err(e) = shared
            .transport
            .register_group_handler(group, mailbox.clone())
        {
            mailbox.close();
            return Err(AnpError::ResourceSetup(format!(
                "Failed to register handler for group {:#x}: {}",
                group, e
            )));
        }

        let undo = |mailbox: &Mailbox| {
            shared.transport.unregister_group_handler(group);
            mailbox.close();
        };

        if let Err(e) = shared.peer.initialize() {
            undo(mailbox.as_ref());
            return Err(e);
        }

        let power_state = shared.power_source.query_power_state();

        let registered = match shared.peer.register_anp_events() {
            Ok(status) if status >= 0 => Ok(()),
            Ok(status) => Err(AnpError::Remote(status)),
            Err(e) => Err(e),
        };
        if let Err(e) = registered {
            undo(mailbox.as_ref());
            shared.peer.cleanup();
            return Err(e);
        }

        let mut state = shared.session.lock();
        state.callback_ids.reset();
        state.transactions.reset();
        state.peer_events_registered = true;
        state.power_state = power_state;
        state.mailbox = Some(mailbox);
        state.lifecycle = ManagerState::Running;
        shared.live.set(generation);
        Ok(())
    }

    /// Stop the manager
    ///
    /// Unregisters from the platform server, drops every registration and
    /// outstanding transaction, and returns to `Uninitialized`. Does nothing
    /// unless running.
    pub fn shutdown(&self) {
        let shared = &self.shared;
        let _gate = shared.peer_gate.lock();

        let (events_registered, server_callback_id, mailbox) = {
            let mut state = shared.session.lock();
            if !state.is_running() {
                tracing::debug!("ANP manager is {}, ignoring shutdown", state.lifecycle);
                return;
            }
            state.lifecycle = ManagerState::ShuttingDown;
            shared.live.clear();
            (
                state.peer_events_registered,
                state.server_callback_id,
                state.mailbox.take(),
            )
        };

        tracing::info!("Shutting down ANP manager");
        shared
            .transport
            .unregister_group_handler(shared.config.message_group);

        if events_registered {
            if let Err(e) = shared.peer.unregister_anp_events() {
                tracing::warn!("Failed to unregister ANP events: {}", e);
            }
        }
        if server_callback_id != 0 {
            if let Err(e) = shared.peer.unregister_client_events(server_callback_id) {
                tracing::warn!("Failed to unregister ANP client events: {}", e);
            }
        }

        shared.peer.cleanup();
        if let Some(mailbox) = mailbox {
            mailbox.close();
        }

        shared.session.lock().reset();
        tracing::info!("ANP manager shut down");
    }

    /// Start or stop the manager, as the hosting framework's module entry
    /// point does
    pub fn handle_initialization(&self, enable: bool) -> Result<(), AnpError> {
        if enable {
            self.initialize()
        } else {
            self.shutdown();
            Ok(())
        }
    }

    /// Record a device power transition
    pub fn handle_power_event(&self, event: DevicePowerEvent) {
        let mut state = self.shared.session.lock();
        if !state.is_running() {
            return;
        }
        state.power_state = match event {
            DevicePowerEvent::PoweredOn => PowerState::On,
            DevicePowerEvent::PoweringOff | DevicePowerEvent::PoweredOff => PowerState::Off,
        };
        tracing::debug!("Device power event {:?}", event);
    }

    // ========================================================================
    // Server role
    // ========================================================================

    /// Subscribe to connection and category-change events
    pub fn register_server_callback<F>(&self, callback: F) -> Result<CallbackId, AnpError>
    where
        F: Fn(&AnpEvent) + Send + Sync + 'static,
    {
        let mut state = self.shared.session.lock();
        state.ensure_running()?;

        let callback_id = CallbackId::new(state.callback_ids.next_id());
        state
            .server_callbacks
            .insert(CallbackEntry::new(callback_id, Arc::new(callback)))
            .map_err(|e| {
                tracing::debug!("Server callback insert failed: {}", e);
                AnpError::UnableToAddEntry
            })?;

        tracing::debug!("Registered server callback {}", callback_id);
        Ok(callback_id)
    }

    /// Remove a server subscription; unknown IDs are ignored
    pub fn unregister_server_callback(&self, callback_id: CallbackId) {
        if callback_id.as_u32() == 0 {
            return;
        }
        let mut state = self.shared.session.lock();
        if state.is_running() && state.server_callbacks.remove(callback_id.as_u32()).is_some() {
            tracing::debug!("Unregistered server callback {}", callback_id);
        }
    }

    /// Publish the local new alert count for `category`
    ///
    /// Returns the platform server's non-negative status.
    pub fn set_new_alert(
        &self,
        category: Category,
        new_alert_count: u32,
        last_alert_text: Option<&str>,
    ) -> Result<i32, AnpError> {
        self.shared.session.lock().ensure_running()?;
        let status = self
            .shared
            .peer
            .set_new_alert(category, new_alert_count, last_alert_text)?;
        non_negative(status)
    }

    /// Publish the local unread alert count for `category`
    ///
    /// Returns the platform server's non-negative status.
    pub fn set_unread_alert(
        &self,
        category: Category,
        unread_alert_count: u32,
    ) -> Result<i32, AnpError> {
        self.shared.session.lock().ensure_running()?;
        let status = self
            .shared
            .peer
            .set_unread_alert(category, unread_alert_count)?;
        non_negative(status)
    }

    // ========================================================================
    // Client role
    // ========================================================================

    /// Register a consumer of the client role
    ///
    /// The first consumer also registers the client role with the platform
    /// server; if that fails the consumer is not registered. Until the server
    /// confirms, the new entry is in the registry but receives no broadcast
    /// events.
    pub fn register_client_callback<F>(&self, callback: F) -> Result<CallbackId, AnpError>
    where
        F: Fn(&AnpEvent) + Send + Sync + 'static,
    {
        let shared = &self.shared;
        let _gate = shared.peer_gate.lock();

        let (callback_id, needs_registration) = {
            let mut state = shared.session.lock();
            state.ensure_running()?;

            let callback_id = CallbackId::new(state.callback_ids.next_id());
            let needs_registration = state.server_callback_id == 0;
            let entry = if needs_registration {
                CallbackEntry::pending(callback_id, Arc::new(callback))
            } else {
                CallbackEntry::new(callback_id, Arc::new(callback))
            };
            state.client_callbacks.insert(entry).map_err(|e| {
                tracing::debug!("Client callback insert failed: {}", e);
                AnpError::UnableToAddEntry
            })?;
            (callback_id, needs_registration)
        };

        if !needs_registration {
            tracing::debug!("Registered client callback {}", callback_id);
            return Ok(callback_id);
        }

        let result = shared.peer.register_client_events();
        let mut state = shared.session.lock();
        match result {
            Ok(status) if status > 0 => {
                state.server_callback_id = status as u32;
                if let Some(entry) = state.client_callbacks.find_mut(callback_id.as_u32()) {
                    entry.flags = EntryFlags::EVENT_CALLBACK;
                }
                tracing::debug!(
                    "Registered client callback {} (server callback {})",
                    callback_id,
                    status
                );
                Ok(callback_id)
            }
            other => {
                state.client_callbacks.remove(callback_id.as_u32());
                let err = match other {
                    Ok(0) => AnpError::UnableToAddEntry,
                    Ok(status) => AnpError::Remote(status),
                    Err(e) => e,
                };
                tracing::warn!("Client registration with platform server failed: {}", err);
                Err(err)
            }
        }
    }

    /// Remove a client consumer; unknown IDs are ignored
    ///
    /// Removing the last consumer also unregisters the client role at the
    /// platform server.
    pub fn unregister_client_callback(&self, callback_id: CallbackId) {
        if callback_id.as_u32() == 0 {
            return;
        }
        let shared = &self.shared;
        let _gate = shared.peer_gate.lock();

        let release = {
            let mut state = shared.session.lock();
            if !state.is_running() || state.client_callbacks.remove(callback_id.as_u32()).is_none()
            {
                return;
            }
            tracing::debug!("Unregistered client callback {}", callback_id);

            if state.client_callbacks.is_empty() && state.server_callback_id != 0 {
                Some(std::mem::take(&mut state.server_callback_id))
            } else {
                None
            }
        };

        if let Some(server_callback_id) = release {
            if let Err(e) = shared.peer.unregister_client_events(server_callback_id) {
                tracing::warn!("Failed to unregister ANP client events: {}", e);
            }
        }
    }

    /// Ask a remote server which new alert categories it supports
    pub fn get_supported_new_alert_categories(
        &self,
        callback_id: CallbackId,
        remote_address: BdAddr,
    ) -> Result<RequestOutcome, AnpError> {
        self.correlated_request(callback_id, remote_address, |peer, id| {
            peer.get_supported_categories(id, remote_address, NotificationType::NewAlert)
        })
    }

    /// Ask a remote server which unread status categories it supports
    pub fn get_supported_unread_status_categories(
        &self,
        callback_id: CallbackId,
        remote_address: BdAddr,
    ) -> Result<RequestOutcome, AnpError> {
        self.correlated_request(callback_id, remote_address, |peer, id| {
            peer.get_supported_categories(id, remote_address, NotificationType::UnreadStatus)
        })
    }

    /// Turn on new alert notifications from a remote server
    pub fn enable_new_alert_notifications(
        &self,
        callback_id: CallbackId,
        remote_address: BdAddr,
    ) -> Result<RequestOutcome, AnpError> {
        self.correlated_request(callback_id, remote_address, |peer, id| {
            peer.enable_disable_notifications(id, remote_address, NotificationType::NewAlert, true)
        })
    }

    /// Turn on unread status notifications from a remote server
    pub fn enable_unread_status_notifications(
        &self,
        callback_id: CallbackId,
        remote_address: BdAddr,
    ) -> Result<RequestOutcome, AnpError> {
        self.correlated_request(callback_id, remote_address, |peer, id| {
            peer.enable_disable_notifications(
                id,
                remote_address,
                NotificationType::UnreadStatus,
                true,
            )
        })
    }

    /// Turn off new alert notifications from a remote server
    pub fn disable_new_alert_notifications(
        &self,
        callback_id: CallbackId,
        remote_address: BdAddr,
    ) -> Result<RequestOutcome, AnpError> {
        self.status_request(callback_id, remote_address, |peer, id| {
            peer.enable_disable_notifications(id, remote_address, NotificationType::NewAlert, false)
        })
    }

    /// Turn off unread status notifications from a remote server
    pub fn disable_unread_status_notifications(
        &self,
        callback_id: CallbackId,
        remote_address: BdAddr,
    ) -> Result<RequestOutcome, AnpError> {
        self.status_request(callback_id, remote_address, |peer, id| {
            peer.enable_disable_notifications(
                id,
                remote_address,
                NotificationType::UnreadStatus,
                false,
            )
        })
    }

    /// Enable one new alert category at a remote server
    pub fn enable_new_alert_category(
        &self,
        callback_id: CallbackId,
        remote_address: BdAddr,
        category: Category,
    ) -> Result<RequestOutcome, AnpError> {
        self.correlated_request(callback_id, remote_address, |peer, id| {
            peer.enable_disable_category(
                id,
                remote_address,
                category,
                NotificationType::NewAlert,
                true,
            )
        })
    }

    /// Enable one unread status category at a remote server
    pub fn enable_unread_status_category(
        &self,
        callback_id: CallbackId,
        remote_address: BdAddr,
        category: Category,
    ) -> Result<RequestOutcome, AnpError> {
        self.correlated_request(callback_id, remote_address, |peer, id| {
            peer.enable_disable_category(
                id,
                remote_address,
                category,
                NotificationType::UnreadStatus,
                true,
            )
        })
    }

    /// Disable one new alert category at a remote server
    pub fn disable_new_alert_category(
        &self,
        callback_id: CallbackId,
        remote_address: BdAddr,
        category: Category,
    ) -> Result<RequestOutcome, AnpError> {
        self.status_request(callback_id, remote_address, |peer, id| {
            peer.enable_disable_category(
                id,
                remote_address,
                category,
                NotificationType::NewAlert,
                false,
            )
        })
    }

    /// Disable one unread status category at a remote server
    pub fn disable_unread_status_category(
        &self,
        callback_id: CallbackId,
        remote_address: BdAddr,
        category: Category,
    ) -> Result<RequestOutcome, AnpError> {
        self.status_request(callback_id, remote_address, |peer, id| {
            peer.enable_disable_category(
                id,
                remote_address,
                category,
                NotificationType::UnreadStatus,
                false,
            )
        })
    }

    /// Ask a remote server to send a new alert notification now
    pub fn request_new_alert_notification(
        &self,
        callback_id: CallbackId,
        remote_address: BdAddr,
        category: Category,
    ) -> Result<RequestOutcome, AnpError> {
        self.correlated_request(callback_id, remote_address, |peer, id| {
            peer.request_notification(id, remote_address, category, NotificationType::NewAlert)
        })
    }

    /// Ask a remote server to send an unread status notification now
    pub fn request_unread_status_notification(
        &self,
        callback_id: CallbackId,
        remote_address: BdAddr,
        category: Category,
    ) -> Result<RequestOutcome, AnpError> {
        self.correlated_request(callback_id, remote_address, |peer, id| {
            peer.request_notification(
                id,
                remote_address,
                category,
                NotificationType::UnreadStatus,
            )
        })
    }

    /// Check arguments and the caller's registration; returns the server
    /// callback ID to put in the request
    fn validate_client(
        state: &SessionState,
        callback_id: CallbackId,
        remote_address: BdAddr,
    ) -> Result<u32, AnpError> {
        state.ensure_running()?;
        if callback_id.as_u32() == 0 {
            return Err(AnpError::InvalidParameter("callback_id"));
        }
        if remote_address.is_null() {
            return Err(AnpError::InvalidParameter("remote_address"));
        }
        if state.client_callbacks.find(callback_id.as_u32()).is_none() {
            return Err(AnpError::UnknownCallbackId(callback_id.as_u32()));
        }
        Ok(state.server_callback_id)
    }

    /// Send a request whose result arrives later as an event
    fn correlated_request<F>(
        &self,
        callback_id: CallbackId,
        remote_address: BdAddr,
        send: F,
    ) -> Result<RequestOutcome, AnpError>
    where
        F: FnOnce(&PeerLink, u32) -> Result<i32, AnpError>,
    {
        let shared = &self.shared;
        let _gate = shared.peer_gate.lock();

        let (transaction_id, server_callback_id) = {
            let mut state = shared.session.lock();
            let server_callback_id = Self::validate_client(&state, callback_id, remote_address)?;
            let transaction_id = state.transactions.begin(callback_id).map_err(|e| {
                tracing::debug!("Transaction insert failed: {}", e);
                AnpError::UnableToAddEntry
            })?;
            (transaction_id, server_callback_id)
        };

        let result = send(&shared.peer, server_callback_id);

        let mut state = shared.session.lock();
        match result {
            Ok(status) if status > 0 => {
                let server_transaction_id = ServerTransactionId(status as u32);
                if !state
                    .transactions
                    .bind_server_id(transaction_id, server_transaction_id)
                {
                    tracing::warn!(
                        "Transaction {} vanished before {} was bound",
                        transaction_id,
                        server_transaction_id
                    );
                }
                tracing::debug!(
                    "Transaction {} pending as {}",
                    transaction_id,
                    server_transaction_id
                );
                Ok(RequestOutcome::Pending(transaction_id))
            }
            other => {
                state.transactions.abandon(transaction_id);
                match other {
                    Ok(0) => Ok(RequestOutcome::Completed),
                    Ok(status) => Err(AnpError::Remote(status)),
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Send a request that completes with its status
    fn status_request<F>(
        &self,
        callback_id: CallbackId,
        remote_address: BdAddr,
        send: F,
    ) -> Result<RequestOutcome, AnpError>
    where
        F: FnOnce(&PeerLink, u32) -> Result<i32, AnpError>,
    {
        let shared = &self.shared;
        let _gate = shared.peer_gate.lock();

        let server_callback_id = {
            let state = shared.session.lock();
            Self::validate_client(&state, callback_id, remote_address)?
        };

        non_negative(send(&shared.peer, server_callback_id)?).map(|_| RequestOutcome::Completed)
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Current lifecycle state
    pub fn state(&self) -> ManagerState {
        self.shared.session.lock().lifecycle
    }

    /// Whether the manager is running
    pub fn is_initialized(&self) -> bool {
        self.shared.live.is_running()
    }

    /// Last recorded device power state
    pub fn power_state(&self) -> PowerState {
        self.shared.session.lock().power_state
    }

    /// ID the platform server assigned to the client role, if registered
    pub fn server_callback_id(&self) -> Option<u32> {
        match self.shared.session.lock().server_callback_id {
            0 => None,
            id => Some(id),
        }
    }

    /// Whether the server role is subscribed to ANP events
    pub fn peer_events_registered(&self) -> bool {
        self.shared.session.lock().peer_events_registered
    }

    /// Number of requests awaiting completion
    pub fn outstanding_transactions(&self) -> usize {
        self.shared.session.lock().transactions.len()
    }

    /// Number of registered server subscribers
    pub fn server_callback_count(&self) -> usize {
        self.shared.session.lock().server_callbacks.len()
    }

    /// Number of registered client consumers
    pub fn client_callback_count(&self) -> usize {
        self.shared.session.lock().client_callbacks.len()
    }

    /// Configuration this manager was created with
    pub fn config(&self) -> &ManagerConfig {
        &self.shared.config
    }
}

fn non_negative(status: i32) -> Result<i32, AnpError> {
    if status < 0 {
        Err(AnpError::Remote(status))
    } else {
        Ok(status)
    }
}
