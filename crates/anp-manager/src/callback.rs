//! Registered event callbacks

use std::fmt;
use std::sync::Arc;

use anp_core::CallbackId;
use anp_protocol::BdAddr;

use crate::events::AnpEvent;
use crate::registry::RegistryEntry;

/// Consumer-supplied event handler
///
/// Any context the consumer needs is captured by the closure and handed back
/// unchanged on every call.
pub type EventCallback = Arc<dyn Fn(&AnpEvent) + Send + Sync>;

/// Per-entry flag bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryFlags(u32);

impl EntryFlags {
    /// Entry receives broadcast events
    pub const EVENT_CALLBACK: EntryFlags = EntryFlags(0x4000_0000);

    /// No flags set
    pub const fn empty() -> Self {
        EntryFlags(0)
    }

    /// Whether every bit of `other` is set
    pub fn contains(&self, other: EntryFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raw bits
    pub fn bits(&self) -> u32 {
        self.0
    }
}

/// A registered callback
pub struct CallbackEntry {
    /// Registry key
    pub callback_id: CallbackId,
    /// Entry flags
    pub flags: EntryFlags,
    /// Remote device this entry is scoped to; unused by the current
    /// requests, which carry the address per call
    pub peer_address: Option<BdAddr>,
    /// Handler invoked for events
    pub callback: EventCallback,
}

impl CallbackEntry {
    /// Create an event-callback entry
    pub fn new(callback_id: CallbackId, callback: EventCallback) -> Self {
        Self {
            callback_id,
            flags: EntryFlags::EVENT_CALLBACK,
            peer_address: None,
            callback,
        }
    }

    /// Create an entry that is skipped by broadcasts until its
    /// `EVENT_CALLBACK` flag is set
    pub fn pending(callback_id: CallbackId, callback: EventCallback) -> Self {
        Self {
            flags: EntryFlags::empty(),
            ..Self::new(callback_id, callback)
        }
    }

    /// Whether broadcast dispatch should include this entry
    pub fn is_event_callback(&self) -> bool {
        self.flags.contains(EntryFlags::EVENT_CALLBACK)
    }
}

impl RegistryEntry for CallbackEntry {
    fn key(&self) -> u32 {
        self.callback_id.as_u32()
    }
}

impl fmt::Debug for CallbackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackEntry")
            .field("callback_id", &self.callback_id)
            .field("flags", &format_args!("{:#010x}", self.flags.bits()))
            .field("peer_address", &self.peer_address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_is_event_callback() {
        let entry = CallbackEntry::new(CallbackId::new(3), Arc::new(|_: &AnpEvent| {}));
        assert!(entry.is_event_callback());
        assert_eq!(entry.key(), 3);
        assert_eq!(entry.peer_address, None);
    }

    #[test]
    fn test_pending_entry_waits_for_flag() {
        let mut entry = CallbackEntry::pending(CallbackId::new(4), Arc::new(|_: &AnpEvent| {}));
        assert!(!entry.is_event_callback());
        assert_eq!(entry.flags.bits(), 0);

        entry.flags = EntryFlags::EVENT_CALLBACK;
        assert!(entry.is_event_callback());
        assert_eq!(entry.peer_address, None);
    }
}
