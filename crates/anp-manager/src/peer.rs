//! Requests to the platform server
//!
//! Every request is a message in the ANP group addressed to the transport's
//! server endpoint. The call blocks until the status response arrives or the
//! configured timeout elapses. The returned status is passed back untouched;
//! the caller decides what a positive, zero or negative status means.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use anp_core::{AnpError, MessageTransport};
use anp_protocol::records::{
    EmptyRequest, EnableDisableCategoryRequest, EnableDisableNotificationsRequest,
    GetSupportedCategoriesRequest, RequestNotificationRequest, SetNewAlertRequest,
    SetUnreadAlertRequest, StatusResponse, UnregisterClientEventsRequest,
};
use anp_protocol::{BdAddr, Category, Message, MessageFunction, NotificationType, WireRecord};

use crate::id::IdGenerator;

struct LinkState {
    initialized: bool,
    message_ids: IdGenerator,
}

/// Request layer over a [`MessageTransport`]
pub struct PeerLink {
    transport: Arc<dyn MessageTransport>,
    timeout: Duration,
    inner: Mutex<LinkState>,
}

impl PeerLink {
    /// Create an uninitialized link
    pub fn new(transport: Arc<dyn MessageTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            inner: Mutex::new(LinkState {
                initialized: false,
                message_ids: IdGenerator::new(),
            }),
        }
    }

    /// Enable requests
    pub fn initialize(&self) -> Result<(), AnpError> {
        let mut inner = self.inner.lock();
        if inner.initialized {
            return Err(AnpError::AlreadyInitialized);
        }
        inner.initialized = true;
        Ok(())
    }

    /// Disable requests
    pub fn cleanup(&self) {
        self.inner.lock().initialized = false;
    }

    /// Whether requests are enabled
    pub fn is_initialized(&self) -> bool {
        self.inner.lock().initialized
    }

    fn request<T: WireRecord>(&self, function: MessageFunction, record: &T) -> Result<i32, AnpError> {
        let message_id = {
            let mut inner = self.inner.lock();
            if !inner.initialized {
                return Err(AnpError::NotInitialized);
            }
            inner.message_ids.next_id()
        };

        let request = Message::encode_request(
            self.transport.server_address_id(),
            message_id,
            function,
            record,
        )?;

        tracing::trace!("Sending {:?} (message {})", function, message_id);
        let response = self.transport.send_and_wait(request, self.timeout)?;
        let status: StatusResponse = response.decode()?;

        tracing::debug!("{:?} returned status {}", function, status.status);
        Ok(status.status)
    }

    /// Subscribe the local server role to ANP events
    pub fn register_anp_events(&self) -> Result<i32, AnpError> {
        self.request(MessageFunction::RegisterAnpEvents, &EmptyRequest)
    }

    /// Drop the local server role's event subscription
    pub fn unregister_anp_events(&self) -> Result<i32, AnpError> {
        self.request(MessageFunction::UnregisterAnpEvents, &EmptyRequest)
    }

    /// Publish the local new alert count
    pub fn set_new_alert(
        &self,
        category: Category,
        new_alert_count: u32,
        last_alert_text: Option<&str>,
    ) -> Result<i32, AnpError> {
        self.request(
            MessageFunction::SetNewAlert,
            &SetNewAlertRequest {
                category,
                new_alert_count,
                last_alert_text: last_alert_text.map(str::to_owned),
            },
        )
    }

    /// Publish the local unread alert count
    pub fn set_unread_alert(&self, category: Category, unread_alert_count: u32) -> Result<i32, AnpError> {
        self.request(
            MessageFunction::SetUnreadAlert,
            &SetUnreadAlertRequest {
                category,
                unread_alert_count,
            },
        )
    }

    /// Register the client role; a positive status is the server callback ID
    pub fn register_client_events(&self) -> Result<i32, AnpError> {
        self.request(MessageFunction::RegisterAnpClientEvents, &EmptyRequest)
    }

    /// Drop the client role registration
    pub fn unregister_client_events(&self, server_callback_id: u32) -> Result<i32, AnpError> {
        self.request(
            MessageFunction::UnregisterAnpClientEvents,
            &UnregisterClientEventsRequest {
                client_callback_id: server_callback_id,
            },
        )
    }

    /// Ask a remote server for its supported categories
    pub fn get_supported_categories(
        &self,
        server_callback_id: u32,
        remote_address: BdAddr,
        notification_type: NotificationType,
    ) -> Result<i32, AnpError> {
        self.request(
            MessageFunction::GetSupportedCategories,
            &GetSupportedCategoriesRequest {
                client_callback_id: server_callback_id,
                remote_address,
                notification_type,
            },
        )
    }

    /// Turn a remote server's notifications on or off
    pub fn enable_disable_notifications(
        &self,
        server_callback_id: u32,
        remote_address: BdAddr,
        notification_type: NotificationType,
        enable: bool,
    ) -> Result<i32, AnpError> {
        self.request(
            MessageFunction::EnableDisableNotifications,
            &EnableDisableNotificationsRequest {
                client_callback_id: server_callback_id,
                remote_address,
                notification_type,
                enable,
            },
        )
    }

    /// Turn a single category on or off at a remote server
    pub fn enable_disable_category(
        &self,
        server_callback_id: u32,
        remote_address: BdAddr,
        category: Category,
        notification_type: NotificationType,
        enable: bool,
    ) -> Result<i32, AnpError> {
        self.request(
            MessageFunction::EnableDisableCategory,
            &EnableDisableCategoryRequest {
                client_callback_id: server_callback_id,
                remote_address,
                notification_type,
                enable,
                category,
            },
        )
    }

    /// Ask a remote server to notify now
    pub fn request_notification(
        &self,
        server_callback_id: u32,
        remote_address: BdAddr,
        category: Category,
        notification_type: NotificationType,
    ) -> Result<i32, AnpError> {
        self.request(
            MessageFunction::RequestNotification,
            &RequestNotificationRequest {
                client_callback_id: server_callback_id,
                remote_address,
                notification_type,
                category,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anp_core::{GroupHandler, TransportError};
    use anp_protocol::header::MESSAGE_ID_RESPONSE_MASK;
    use bytes::Bytes;

    /// Answers every request with a fixed payload and remembers what it saw
    struct FixedTransport {
        reply: Bytes,
        sent: Mutex<Vec<Message>>,
    }

    impl FixedTransport {
        fn status(status: i32) -> Arc<Self> {
            Self::raw(Bytes::copy_from_slice(&status.to_le_bytes()))
        }

        fn raw(reply: Bytes) -> Arc<Self> {
            Arc::new(Self {
                reply,
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    impl MessageTransport for FixedTransport {
        fn send_and_wait(
            &self,
            request: Message,
            _timeout: Duration,
        ) -> Result<Message, TransportError> {
            let mut header = request.header;
            header.message_id |= MESSAGE_ID_RESPONSE_MASK;
            self.sent.lock().push(request);
            Ok(Message::new(header, self.reply.clone()))
        }

        fn register_group_handler(
            &self,
            _group: u32,
            _handler: Arc<dyn GroupHandler>,
        ) -> Result<(), TransportError> {
            Ok(())
        }

        fn unregister_group_handler(&self, _group: u32) {}

        fn server_address_id(&self) -> u32 {
            77
        }
    }

    fn link(transport: &Arc<FixedTransport>) -> PeerLink {
        PeerLink::new(transport.clone(), Duration::from_millis(100))
    }

    #[test]
    fn test_initialize_twice() {
        let transport = FixedTransport::status(0);
        let peer = link(&transport);
        peer.initialize().unwrap();
        assert!(matches!(peer.initialize(), Err(AnpError::AlreadyInitialized)));

        peer.cleanup();
        assert!(!peer.is_initialized());
        peer.initialize().unwrap();
    }

    #[test]
    fn test_requests_require_initialize() {
        let transport = FixedTransport::status(0);
        let peer = link(&transport);
        assert!(matches!(
            peer.register_anp_events(),
            Err(AnpError::NotInitialized)
        ));
        assert!(transport.sent.lock().is_empty());
    }

    #[test]
    fn test_request_addresses_server_endpoint() {
        let transport = FixedTransport::status(3);
        let peer = link(&transport);
        peer.initialize().unwrap();

        assert_eq!(peer.set_unread_alert(Category::Email, 2).unwrap(), 3);
        assert_eq!(peer.set_new_alert(Category::Call, 1, Some("Mom")).unwrap(), 3);

        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|m| m.header.address_id == 77));
        assert_eq!(sent[0].function(), Some(MessageFunction::SetUnreadAlert));
        assert_eq!(sent[0].header.message_id, 1);
        assert_eq!(sent[1].header.message_id, 2);

        let record: SetNewAlertRequest = sent[1].decode().unwrap();
        assert_eq!(record.last_alert_text.as_deref(), Some("Mom"));
    }

    #[test]
    fn test_request_carries_server_callback_id() {
        let transport = FixedTransport::status(500);
        let peer = link(&transport);
        peer.initialize().unwrap();

        let addr = BdAddr::new([1, 2, 3, 4, 5, 6]);
        let status = peer
            .enable_disable_category(9, addr, Category::Schedule, NotificationType::UnreadStatus, true)
            .unwrap();
        assert_eq!(status, 500);

        let sent = transport.sent.lock();
        let record: EnableDisableCategoryRequest = sent[0].decode().unwrap();
        assert_eq!(record.client_callback_id, 9);
        assert_eq!(record.remote_address, addr);
        assert_eq!(record.category, Category::Schedule);
        assert!(record.enable);
    }

    #[test]
    fn test_short_response_is_invalid() {
        let transport = FixedTransport::raw(Bytes::from_static(&[1, 0]));
        let peer = link(&transport);
        peer.initialize().unwrap();

        match peer.register_client_events() {
            Err(AnpError::Transport(TransportError::InvalidResponse { expected, actual })) => {
                assert_eq!(expected, 4);
                assert_eq!(actual, 2);
            }
            other => panic!("Expected InvalidResponse, got {:?}", other),
        }
    }
}
