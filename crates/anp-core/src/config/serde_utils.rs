//! Serde adapters for configuration fields

/// `Duration` written as a whole number of milliseconds
///
/// Used for `response_timeout`. Zero is rejected on load; a request with
/// no time to answer always fails.
pub mod timeout_millis {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(timeout: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match u64::deserialize(deserializer)? {
            0 => Err(D::Error::custom("timeout must be at least 1 ms")),
            millis => Ok(Duration::from_millis(millis)),
        }
    }
}
