//! Identifier generation
//!
//! Callback IDs, transaction IDs and outbound message IDs each come from
//! their own generator. Values start at 1, never reach 0 and never set the
//! top bit, which the message layer reserves for responses.

/// Largest value a generator hands out
pub const MAX_ID: u32 = 0x7FFF_FFFF;

/// Monotonic 31-bit identifier source
///
/// Not synchronized; the owner keeps it behind its own lock.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    next: u32,
}

impl IdGenerator {
    /// Create a generator whose first ID is 1
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Create a generator whose next ID is `next` (clamped into range)
    pub fn starting_at(next: u32) -> Self {
        let mut generator = Self { next };
        generator.normalize();
        generator
    }

    /// Return the current ID and advance
    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        self.normalize();
        id
    }

    /// Start again from 1
    pub fn reset(&mut self) {
        self.next = 1;
    }

    /// The ID the next call to [`next_id`](Self::next_id) returns
    pub fn peek(&self) -> u32 {
        self.next
    }

    fn normalize(&mut self) {
        if self.next == 0 || self.next > MAX_ID {
            self.next = 1;
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
