//! Bluetooth device address type

use serde::{Deserialize, Serialize};
use std::fmt;

/// 48-bit Bluetooth device address, most significant byte first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BdAddr(pub [u8; 6]);

impl BdAddr {
    /// The all-zero address, never a valid peer
    pub const NULL: BdAddr = BdAddr([0; 6]);

    /// Create an address from its six bytes
    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Whether this is the all-zero address
    pub fn is_null(&self) -> bool {
        self.0 == [0; 6]
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl From<[u8; 6]> for BdAddr {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}
