//! Events delivered to registered callbacks

use anp_core::TransactionId;
use anp_protocol::{BdAddr, Category, CategoryMask, ConnectionType};

/// An event reported by the ANP manager
///
/// Server-role callbacks see connection and category-change events.
/// Client-role callbacks see connection events, alert notifications pushed
/// by remote servers, and the completions of their own requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnpEvent {
    /// A remote device connected
    Connected {
        connection_type: ConnectionType,
        remote_address: BdAddr,
    },

    /// A remote device disconnected
    Disconnected {
        connection_type: ConnectionType,
        remote_address: BdAddr,
    },

    /// A remote client enabled one of our new alert categories
    NewAlertCategoryEnabled {
        remote_address: BdAddr,
        category: Category,
        enabled_categories: CategoryMask,
    },

    /// A remote client disabled one of our new alert categories
    NewAlertCategoryDisabled {
        remote_address: BdAddr,
        category: Category,
        enabled_categories: CategoryMask,
    },

    /// A remote client enabled one of our unread status categories
    UnreadStatusCategoryEnabled {
        remote_address: BdAddr,
        category: Category,
        enabled_categories: CategoryMask,
    },

    /// A remote client disabled one of our unread status categories
    UnreadStatusCategoryDisabled {
        remote_address: BdAddr,
        category: Category,
        enabled_categories: CategoryMask,
    },

    /// Completion of `get_supported_new_alert_categories`
    SupportedNewAlertCategoriesResult {
        remote_address: BdAddr,
        transaction_id: TransactionId,
        status: u32,
        att_protocol_error_code: u32,
        supported_categories: u32,
    },

    /// Completion of `get_supported_unread_status_categories`
    SupportedUnreadCategoriesResult {
        remote_address: BdAddr,
        transaction_id: TransactionId,
        status: u32,
        att_protocol_error_code: u32,
        supported_categories: u32,
    },

    /// A remote server reported new alerts
    NewAlertNotification {
        remote_address: BdAddr,
        category: Category,
        number_new_alerts: u32,
        last_alert_text: Option<String>,
    },

    /// A remote server reported its unread alert count
    UnreadStatusNotification {
        remote_address: BdAddr,
        category: Category,
        number_unread_alerts: u32,
    },

    /// Completion of a control point command
    CommandResult {
        remote_address: BdAddr,
        transaction_id: TransactionId,
        status: u32,
        att_protocol_error_code: u32,
    },
}

impl AnpEvent {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            AnpEvent::Connected { .. } => "connected",
            AnpEvent::Disconnected { .. } => "disconnected",
            AnpEvent::NewAlertCategoryEnabled { .. } => "new_alert_category_enabled",
            AnpEvent::NewAlertCategoryDisabled { .. } => "new_alert_category_disabled",
            AnpEvent::UnreadStatusCategoryEnabled { .. } => "unread_status_category_enabled",
            AnpEvent::UnreadStatusCategoryDisabled { .. } => "unread_status_category_disabled",
            AnpEvent::SupportedNewAlertCategoriesResult { .. } => {
                "supported_new_alert_categories_result"
            }
            AnpEvent::SupportedUnreadCategoriesResult { .. } => "supported_unread_categories_result",
            AnpEvent::NewAlertNotification { .. } => "new_alert_notification",
            AnpEvent::UnreadStatusNotification { .. } => "unread_status_notification",
            AnpEvent::CommandResult { .. } => "command_result",
        }
    }

    /// Address of the remote device the event concerns
    pub fn remote_address(&self) -> BdAddr {
        match self {
            AnpEvent::Connected { remote_address, .. }
            | AnpEvent::Disconnected { remote_address, .. }
            | AnpEvent::NewAlertCategoryEnabled { remote_address, .. }
            | AnpEvent::NewAlertCategoryDisabled { remote_address, .. }
            | AnpEvent::UnreadStatusCategoryEnabled { remote_address, .. }
            | AnpEvent::UnreadStatusCategoryDisabled { remote_address, .. }
            | AnpEvent::SupportedNewAlertCategoriesResult { remote_address, .. }
            | AnpEvent::SupportedUnreadCategoriesResult { remote_address, .. }
            | AnpEvent::NewAlertNotification { remote_address, .. }
            | AnpEvent::UnreadStatusNotification { remote_address, .. }
            | AnpEvent::CommandResult { remote_address, .. } => *remote_address,
        }
    }

    /// Local transaction ID for request completions
    pub fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            AnpEvent::SupportedNewAlertCategoriesResult { transaction_id, .. }
            | AnpEvent::SupportedUnreadCategoriesResult { transaction_id, .. }
            | AnpEvent::CommandResult { transaction_id, .. } => Some(*transaction_id),
            _ => None,
        }
    }
}
