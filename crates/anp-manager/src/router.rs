//! Inbound message routing
//!
//! Runs on the dispatch thread. Each message is length-checked, turned into
//! an [`AnpEvent`], and handed to the dispatcher:
//!
//! - connection events go to server subscribers, then client consumers
//! - category changes go to server subscribers
//! - request completions go to the one consumer that made the request
//! - alert notifications from remote servers go to client consumers
//!
//! Items carry the generation of the session whose mailbox queued them.
//! Once that session has ended they are dropped, so a backlog left on an
//! old dispatch thread never touches a later session.

use anp_core::ServerTransactionId;
use anp_protocol::records::{
    CategoryChangeMessage, CommandResultMessage, ConnectionMessage, NewAlertNotificationMessage,
    SupportedCategoriesResultMessage, UnreadStatusNotificationMessage,
};
use anp_protocol::{Message, MessageFunction, WireRecord};
use parking_lot::MutexGuard;

use crate::dispatcher::{self, DispatchTarget};
use crate::events::AnpEvent;
use crate::mailbox::MailboxItem;
use crate::manager::Shared;
use crate::state::SessionState;

/// Handle one item taken off the mailbox of session `generation`
pub(crate) fn handle_item(shared: &Shared, generation: u64, item: MailboxItem) {
    if !shared.live.is(generation) {
        tracing::debug!("Session {} has ended, dropping queued item", generation);
        return;
    }
    match item {
        MailboxItem::Message(message) => process_message(shared, generation, &message),
        MailboxItem::PeerUnregistered => handle_peer_unregistered(shared, generation),
    }
}

/// Route an inbound message to the interested callbacks
pub(crate) fn process_message(shared: &Shared, generation: u64, message: &Message) {
    if message.is_response() {
        tracing::trace!("Ignoring response message {:#x}", message.header.message_id);
        return;
    }
    if message.group() != shared.config.message_group {
        return;
    }
    if !shared.live.is(generation) {
        tracing::debug!("Manager not running, dropping inbound message");
        return;
    }

    let Some(function) = message.function() else {
        tracing::debug!(
            "Unknown ANP function {:#010x}, ignoring",
            message.header.message_function
        );
        return;
    };

    match function {
        MessageFunction::Connected | MessageFunction::Disconnected => {
            let Some(record) = decode::<ConnectionMessage>(message) else {
                return;
            };
            let event = if function == MessageFunction::Connected {
                AnpEvent::Connected {
                    connection_type: record.connection_type,
                    remote_address: record.remote_address,
                }
            } else {
                AnpEvent::Disconnected {
                    connection_type: record.connection_type,
                    remote_address: record.remote_address,
                }
            };
            broadcast(shared, generation, event, DispatchTarget::All);
        }

        MessageFunction::NewAlertCategoryEnabled
        | MessageFunction::NewAlertCategoryDisabled
        | MessageFunction::UnreadAlertCategoryEnabled
        | MessageFunction::UnreadAlertCategoryDisabled => {
            let Some(record) = decode::<CategoryChangeMessage>(message) else {
                return;
            };
            let CategoryChangeMessage {
                remote_address,
                category,
                enabled_categories,
            } = record;
            let event = match function {
                MessageFunction::NewAlertCategoryEnabled => AnpEvent::NewAlertCategoryEnabled {
                    remote_address,
                    category,
                    enabled_categories,
                },
                MessageFunction::NewAlertCategoryDisabled => AnpEvent::NewAlertCategoryDisabled {
                    remote_address,
                    category,
                    enabled_categories,
                },
                MessageFunction::UnreadAlertCategoryEnabled => {
                    AnpEvent::UnreadStatusCategoryEnabled {
                        remote_address,
                        category,
                        enabled_categories,
                    }
                }
                _ => AnpEvent::UnreadStatusCategoryDisabled {
                    remote_address,
                    category,
                    enabled_categories,
                },
            };
            broadcast(shared, generation, event, DispatchTarget::Server);
        }

        MessageFunction::SupportedNewAlertCategoriesResult
        | MessageFunction::SupportedUnreadCategoriesResult => {
            let Some(record) = decode::<SupportedCategoriesResultMessage>(message) else {
                return;
            };
            let new_alert = function == MessageFunction::SupportedNewAlertCategoriesResult;
            complete(
                shared,
                generation,
                ServerTransactionId(record.transaction_id),
                move |transaction_id| {
                    if new_alert {
                        AnpEvent::SupportedNewAlertCategoriesResult {
                            remote_address: record.remote_address,
                            transaction_id,
                            status: record.status,
                            att_protocol_error_code: record.att_protocol_error_code,
                            supported_categories: record.supported_categories,
                        }
                    } else {
                        AnpEvent::SupportedUnreadCategoriesResult {
                            remote_address: record.remote_address,
                            transaction_id,
                            status: record.status,
                            att_protocol_error_code: record.att_protocol_error_code,
                            supported_categories: record.supported_categories,
                        }
                    }
                },
            );
        }

        MessageFunction::NewAlertNotification => {
            let Some(record) = decode::<NewAlertNotificationMessage>(message) else {
                return;
            };
            let event = AnpEvent::NewAlertNotification {
                remote_address: record.remote_address,
                category: record.category,
                number_new_alerts: record.number_new_alerts,
                last_alert_text: record.last_alert_text,
            };
            broadcast(shared, generation, event, DispatchTarget::Client);
        }

        MessageFunction::UnreadStatusNotification => {
            let Some(record) = decode::<UnreadStatusNotificationMessage>(message) else {
                return;
            };
            let event = AnpEvent::UnreadStatusNotification {
                remote_address: record.remote_address,
                category: record.category,
                number_unread_alerts: record.number_unread_alerts,
            };
            broadcast(shared, generation, event, DispatchTarget::Client);
        }

        MessageFunction::CommandResult => {
            let Some(record) = decode::<CommandResultMessage>(message) else {
                return;
            };
            complete(
                shared,
                generation,
                ServerTransactionId(record.transaction_id),
                move |transaction_id| AnpEvent::CommandResult {
                    remote_address: record.remote_address,
                    transaction_id,
                    status: record.status,
                    att_protocol_error_code: record.att_protocol_error_code,
                },
            );
        }

        other => {
            tracing::debug!("Ignoring inbound request function {:?}", other);
        }
    }
}

/// Drop every registration after the platform server forgot this client
pub(crate) fn handle_peer_unregistered(shared: &Shared, generation: u64) {
    let _gate = shared.peer_gate.lock();
    let Some(mut state) = lock_session(shared, generation) else {
        return;
    };
    state.clear_registrations();
    tracing::info!("Platform server dropped this client, cleared all registrations");
}

fn decode<T: WireRecord>(message: &Message) -> Option<T> {
    match message.decode::<T>() {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(
                "Dropping malformed message {:#010x}: {}",
                message.header.message_function,
                e
            );
            None
        }
    }
}

/// Lock the session if `generation` is still the running one
fn lock_session(shared: &Shared, generation: u64) -> Option<MutexGuard<'_, SessionState>> {
    let guard = shared.session.lock();
    (guard.is_running() && shared.live.is(generation)).then_some(guard)
}

fn broadcast(shared: &Shared, generation: u64, event: AnpEvent, target: DispatchTarget) {
    let Some(guard) = lock_session(shared, generation) else {
        return;
    };
    tracing::debug!("Dispatching {} event to {:?} callbacks", event.name(), target);
    dispatcher::dispatch(guard, &shared.live, &event, target);
}

fn complete(
    shared: &Shared,
    generation: u64,
    server_transaction_id: ServerTransactionId,
    build: impl FnOnce(anp_core::TransactionId) -> AnpEvent,
) {
    // Waits for any request still between its remote call and binding the
    // server ID, so the completion cannot overtake the bind
    let gate = shared.peer_gate.lock();
    let Some(guard) = lock_session(shared, generation) else {
        return;
    };
    tracing::debug!("Completing {}", server_transaction_id);
    dispatcher::dispatch_by_transaction(
        guard,
        gate,
        &shared.live,
        server_transaction_id,
        build,
    );
}
