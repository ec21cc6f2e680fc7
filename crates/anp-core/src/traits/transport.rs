//! Message transport traits

use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;
use anp_protocol::Message;

/// Request/response channel to the platform server process
///
/// Implementations own framing, retries and the mapping of responses back to
/// their requests. `send_and_wait` blocks the calling thread.
pub trait MessageTransport: Send + Sync {
    /// Send a request and block until its response arrives or `timeout` elapses
    fn send_and_wait(&self, request: Message, timeout: Duration)
        -> Result<Message, TransportError>;

    /// Route every non-response message of `group` to `handler`
    fn register_group_handler(
        &self,
        group: u32,
        handler: Arc<dyn GroupHandler>,
    ) -> Result<(), TransportError>;

    /// Stop routing `group`
    fn unregister_group_handler(&self, group: u32);

    /// Address ID of the platform server endpoint
    fn server_address_id(&self) -> u32;
}

/// Receiver of inbound messages for one message group
///
/// Called on the transport's receive thread; implementations must not block.
pub trait GroupHandler: Send + Sync {
    /// Handle one inbound message
    fn handle_message(&self, message: Message);
}
