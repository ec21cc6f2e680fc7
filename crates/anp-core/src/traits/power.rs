//! Device power state source

use crate::types::PowerState;

/// Query for the local Bluetooth device's current power state
pub trait PowerStateSource: Send + Sync {
    /// Current power state
    fn query_power_state(&self) -> PowerState;
}
