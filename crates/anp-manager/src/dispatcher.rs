//! Event delivery
//!
//! Callbacks are never invoked with the session mutex held. Delivery takes
//! a snapshot of the target callbacks while the caller still holds the lock,
//! releases it, then calls each handler in registration order. A handler
//! that panics is logged and skipped. If the session the snapshot was taken
//! from ends part way through, the remaining handlers are not called, even
//! if a new session has started in the meantime.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use parking_lot::MutexGuard;

use anp_core::{CallbackId, ServerTransactionId, TransactionId};

use crate::callback::{CallbackEntry, EventCallback};
use crate::events::AnpEvent;
use crate::registry::Registry;
use crate::state::{LiveSession, SessionState};

/// Which registries receive a broadcast event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchTarget {
    /// Server-role subscribers only
    Server,
    /// Client-role consumers only
    Client,
    /// Server-role subscribers, then client-role consumers
    All,
}

fn snapshot(registry: &Registry<CallbackEntry>, into: &mut Vec<(CallbackId, EventCallback)>) {
    into.extend(
        registry
            .iter()
            .filter(|entry| entry.is_event_callback())
            .map(|entry| (entry.callback_id, entry.callback.clone())),
    );
}

/// Deliver `event` to every flagged callback of `target`
///
/// Consumes the session guard; it is released before the first callback
/// runs. Returns the number of callbacks invoked.
pub(crate) fn dispatch(
    guard: MutexGuard<'_, SessionState>,
    live: &LiveSession,
    event: &AnpEvent,
    target: DispatchTarget,
) -> usize {
    let generation = live.current();
    let mut callbacks = Vec::new();
    match target {
        DispatchTarget::Server => snapshot(&guard.server_callbacks, &mut callbacks),
        DispatchTarget::Client => snapshot(&guard.client_callbacks, &mut callbacks),
        DispatchTarget::All => {
            snapshot(&guard.server_callbacks, &mut callbacks);
            snapshot(&guard.client_callbacks, &mut callbacks);
        }
    }
    drop(guard);

    if callbacks.is_empty() {
        tracing::trace!("No callbacks registered for {} event", event.name());
        return 0;
    }

    let mut delivered = 0;
    for (callback_id, callback) in callbacks {
        if !live.is(generation) {
            tracing::debug!("Session ended during {} dispatch", event.name());
            break;
        }
        invoke(callback_id, &callback, event);
        delivered += 1;
    }
    delivered
}

/// Deliver a request completion to the callback that started the request
///
/// Pops the transaction bound to `server_transaction_id`, resolves its client
/// callback, and builds the event with the local transaction ID. Both guards
/// are released before the callback runs. A miss on either lookup drops the
/// completion. Returns whether the callback was invoked.
pub(crate) fn dispatch_by_transaction<G>(
    mut guard: MutexGuard<'_, SessionState>,
    gate: G,
    live: &LiveSession,
    server_transaction_id: ServerTransactionId,
    build: impl FnOnce(TransactionId) -> AnpEvent,
) -> bool {
    let generation = live.current();
    let Some(transaction) = guard
        .transactions
        .complete_by_server_id(server_transaction_id)
    else {
        tracing::debug!(
            "No outstanding transaction for {}, dropping completion",
            server_transaction_id
        );
        return false;
    };

    let callback = guard
        .client_callbacks
        .find(transaction.callback_id.as_u32())
        .map(|entry| entry.callback.clone());
    drop(guard);
    drop(gate);

    let Some(callback) = callback else {
        tracing::debug!(
            "Callback {} for transaction {} is gone, dropping completion",
            transaction.callback_id,
            transaction.transaction_id
        );
        return false;
    };

    if !live.is(generation) {
        return false;
    }

    let event = build(transaction.transaction_id);
    invoke(transaction.callback_id, &callback, &event);
    true
}

fn invoke(callback_id: CallbackId, callback: &EventCallback, event: &AnpEvent) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
        tracing::warn!(
            "Callback {} panicked handling {} event: {}",
            callback_id,
            event.name(),
            panic_message(&*payload)
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
