//! Manager configuration

use anp_protocol::ANP_MESSAGE_GROUP;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::timeout_millis;

/// Configuration for an ANP manager instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// How long a request waits for the platform server's response
    #[serde(with = "timeout_millis")]
    pub response_timeout: Duration,

    /// Message group the manager registers its handler for
    pub message_group: u32,

    /// Name of the thread that drains inbound messages
    pub dispatch_queue_name: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_millis(5000),
            message_group: ANP_MESSAGE_GROUP,
            dispatch_queue_name: "anpm-dispatch".to_string(),
        }
    }
}
