//! Alert categories and related enumerations
//!
//! These travel on the wire as little-endian u32 values. Unrecognized values
//! are preserved rather than rejected so that a newer peer cannot make an
//! otherwise well-formed message undecodable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Alert category identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum Category {
    SimpleAlert,
    Email,
    News,
    Call,
    MissedCall,
    SmsMms,
    VoiceMail,
    Schedule,
    HighPriorityAlert,
    InstantMessage,
    /// Wildcard accepted by the category requests
    AllCategories,
    /// Value not known to this implementation
    Other(u32),
}

impl Category {
    /// Wire value
    pub fn as_u32(&self) -> u32 {
        match self {
            Category::SimpleAlert => 0,
            Category::Email => 1,
            Category::News => 2,
            Category::Call => 3,
            Category::MissedCall => 4,
            Category::SmsMms => 5,
            Category::VoiceMail => 6,
            Category::Schedule => 7,
            Category::HighPriorityAlert => 8,
            Category::InstantMessage => 9,
            Category::AllCategories => 0xFF,
            Category::Other(value) => *value,
        }
    }

    /// Bit of this category in a [`CategoryMask`], if it has one
    pub fn mask_bit(&self) -> Option<u16> {
        match self.as_u32() {
            value @ 0..=9 => Some(1 << value),
            _ => None,
        }
    }
}

impl From<u32> for Category {
    fn from(value: u32) -> Self {
        match value {
            0 => Category::SimpleAlert,
            1 => Category::Email,
            2 => Category::News,
            3 => Category::Call,
            4 => Category::MissedCall,
            5 => Category::SmsMms,
            6 => Category::VoiceMail,
            7 => Category::Schedule,
            8 => Category::HighPriorityAlert,
            9 => Category::InstantMessage,
            0xFF => Category::AllCategories,
            other => Category::Other(other),
        }
    }
}

impl From<Category> for u32 {
    fn from(category: Category) -> Self {
        category.as_u32()
    }
}

/// Bitmap of enabled or supported categories (bit n = category n)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryMask(pub u16);

impl CategoryMask {
    /// Whether the category's bit is set
    pub fn contains(&self, category: Category) -> bool {
        category
            .mask_bit()
            .map(|bit| self.0 & bit != 0)
            .unwrap_or(false)
    }
}

impl fmt::Display for CategoryMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Which half of the profile a request or result concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum NotificationType {
    NewAlert,
    UnreadStatus,
    Other(u32),
}

impl From<u32> for NotificationType {
    fn from(value: u32) -> Self {
        match value {
            0 => NotificationType::NewAlert,
            1 => NotificationType::UnreadStatus,
            other => NotificationType::Other(other),
        }
    }
}

impl From<NotificationType> for u32 {
    fn from(value: NotificationType) -> Self {
        match value {
            NotificationType::NewAlert => 0,
            NotificationType::UnreadStatus => 1,
            NotificationType::Other(other) => other,
        }
    }
}

/// Role of the local device on a reported connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum ConnectionType {
    Server,
    Client,
    Other(u32),
}

impl From<u32> for ConnectionType {
    fn from(value: u32) -> Self {
        match value {
            0 => ConnectionType::Server,
            1 => ConnectionType::Client,
            other => ConnectionType::Other(other),
        }
    }
}

impl From<ConnectionType> for u32 {
    fn from(value: ConnectionType) -> Self {
        match value {
            ConnectionType::Server => 0,
            ConnectionType::Client => 1,
            ConnectionType::Other(other) => other,
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionType::Server => write!(f, "server"),
            ConnectionType::Client => write!(f, "client"),
            ConnectionType::Other(value) => write!(f, "unknown({})", value),
        }
    }
}
