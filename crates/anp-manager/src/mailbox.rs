//! Inbound message queue
//!
//! The transport calls the group handler on its own receive thread, which
//! must not block. The mailbox filters and queues what belongs to the
//! manager; a dedicated dispatch thread drains the queue in FIFO order.
//! Closing the mailbox drops the sender, and the thread exits once the
//! queue is empty.

use parking_lot::Mutex;
use tokio::sync::mpsc;

use anp_core::{AnpError, GroupHandler};
use anp_protocol::header::MESSAGE_FUNCTION_MINIMUM;
use anp_protocol::message::{CONTROL_CLIENT_ERROR, CONTROL_CLIENT_REGISTRATION};
use anp_protocol::records::ClientRegistrationMessage;
use anp_protocol::Message;

/// Work item for the dispatch thread
#[derive(Debug)]
pub enum MailboxItem {
    /// A message in the manager's group
    Message(Message),
    /// The platform server forgot this client; drop all registrations
    PeerUnregistered,
}

/// Group handler that feeds the dispatch thread
pub struct Mailbox {
    group: u32,
    tx: Mutex<Option<mpsc::UnboundedSender<MailboxItem>>>,
}

impl Mailbox {
    /// Create a mailbox for `group` and start a thread named `thread_name`
    /// that passes each queued item to `handler`
    pub fn open<F>(group: u32, thread_name: &str, mut handler: F) -> Result<Self, AnpError>
    where
        F: FnMut(MailboxItem) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                tracing::debug!("Dispatch thread started");
                while let Some(item) = rx.blocking_recv() {
                    handler(item);
                }
                tracing::debug!("Dispatch thread stopped");
            })
            .map_err(|e| AnpError::ResourceSetup(format!("Failed to spawn dispatch thread: {}", e)))?;

        Ok(Self {
            group,
            tx: Mutex::new(Some(tx)),
        })
    }

    /// Stop accepting items; the thread drains what is queued and exits
    pub fn close(&self) {
        self.tx.lock().take();
    }

    /// Whether the mailbox still accepts items
    pub fn is_open(&self) -> bool {
        self.tx.lock().is_some()
    }

    fn queue(&self, item: MailboxItem) {
        match self.tx.lock().as_ref() {
            Some(tx) => {
                if tx.send(item).is_err() {
                    tracing::warn!("Dispatch thread gone, dropping inbound message");
                }
            }
            None => tracing::debug!("Mailbox closed, dropping inbound message"),
        }
    }
}

impl GroupHandler for Mailbox {
    fn handle_message(&self, message: Message) {
        if message.group() != self.group {
            tracing::debug!(
                "Ignoring message for group {:#x} (expected {:#x})",
                message.group(),
                self.group
            );
            return;
        }

        let function = message.header.message_function;
        if function >= MESSAGE_FUNCTION_MINIMUM {
            self.queue(MailboxItem::Message(message));
        } else if function == CONTROL_CLIENT_REGISTRATION {
            match message.decode::<ClientRegistrationMessage>() {
                Ok(registration) if !registration.registered => {
                    tracing::info!(
                        "Platform server reports client {} unregistered",
                        registration.address_id
                    );
                    self.queue(MailboxItem::PeerUnregistered);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Malformed client registration message: {}", e),
            }
        } else if function == CONTROL_CLIENT_ERROR {
            tracing::warn!("Platform server reported a client error");
        } else {
            tracing::debug!("Ignoring control function {:#x}", function);
        }
    }
}
