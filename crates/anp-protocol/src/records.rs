//! Payload records carried after the message header
//!
//! Each record is a fixed-layout little-endian structure (bincode with fixed
//! integer encoding). Records that end in text carry it as an optional
//! length-prefixed string, so their `MIN_LEN` covers only the fixed part.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::address::BdAddr;
use crate::alert::{Category, CategoryMask, ConnectionType, NotificationType};

/// A payload record with a known minimum encoded size
pub trait WireRecord: Serialize + DeserializeOwned {
    /// Smallest payload that can hold this record
    const MIN_LEN: usize;
}

// ============================================================================
// Requests
// ============================================================================

/// Payload of every request that has no fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmptyRequest;

impl WireRecord for EmptyRequest {
    const MIN_LEN: usize = 0;
}

/// Set the local new alert count for a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetNewAlertRequest {
    pub category: Category,
    pub new_alert_count: u32,
    pub last_alert_text: Option<String>,
}

impl WireRecord for SetNewAlertRequest {
    const MIN_LEN: usize = 9;
}

/// Set the local unread alert count for a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetUnreadAlertRequest {
    pub category: Category,
    pub unread_alert_count: u32,
}

impl WireRecord for SetUnreadAlertRequest {
    const MIN_LEN: usize = 8;
}

/// Drop the peer-side client registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnregisterClientEventsRequest {
    pub client_callback_id: u32,
}

impl WireRecord for UnregisterClientEventsRequest {
    const MIN_LEN: usize = 4;
}

/// Ask a remote server which categories it supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSupportedCategoriesRequest {
    pub client_callback_id: u32,
    pub remote_address: BdAddr,
    pub notification_type: NotificationType,
}

impl WireRecord for GetSupportedCategoriesRequest {
    const MIN_LEN: usize = 14;
}

/// Turn notifications of one type on or off at a remote server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnableDisableNotificationsRequest {
    pub client_callback_id: u32,
    pub remote_address: BdAddr,
    pub notification_type: NotificationType,
    pub enable: bool,
}

impl WireRecord for EnableDisableNotificationsRequest {
    const MIN_LEN: usize = 15;
}

/// Turn a single category on or off at a remote server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnableDisableCategoryRequest {
    pub client_callback_id: u32,
    pub remote_address: BdAddr,
    pub notification_type: NotificationType,
    pub enable: bool,
    pub category: Category,
}

impl WireRecord for EnableDisableCategoryRequest {
    const MIN_LEN: usize = 19;
}

/// Ask a remote server to notify immediately for a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestNotificationRequest {
    pub client_callback_id: u32,
    pub remote_address: BdAddr,
    pub notification_type: NotificationType,
    pub category: Category,
}

impl WireRecord for RequestNotificationRequest {
    const MIN_LEN: usize = 18;
}

/// Response to every request: a single status word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: i32,
}

impl WireRecord for StatusResponse {
    const MIN_LEN: usize = 4;
}

// ============================================================================
// Asynchronous events
// ============================================================================

/// Connected / disconnected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionMessage {
    pub connection_type: ConnectionType,
    pub remote_address: BdAddr,
}

impl WireRecord for ConnectionMessage {
    const MIN_LEN: usize = 10;
}

/// A remote client enabled or disabled one of our categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryChangeMessage {
    pub remote_address: BdAddr,
    pub category: Category,
    pub enabled_categories: CategoryMask,
}

impl WireRecord for CategoryChangeMessage {
    const MIN_LEN: usize = 12;
}

/// Completion of a get-supported-categories request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedCategoriesResultMessage {
    pub remote_address: BdAddr,
    pub transaction_id: u32,
    pub status: u32,
    pub att_protocol_error_code: u32,
    pub supported_categories: u32,
}

impl WireRecord for SupportedCategoriesResultMessage {
    const MIN_LEN: usize = 22;
}

/// New alert pushed by a remote server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAlertNotificationMessage {
    pub remote_address: BdAddr,
    pub category: Category,
    pub number_new_alerts: u32,
    pub last_alert_text: Option<String>,
}

impl WireRecord for NewAlertNotificationMessage {
    const MIN_LEN: usize = 15;
}

/// Unread status pushed by a remote server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadStatusNotificationMessage {
    pub remote_address: BdAddr,
    pub category: Category,
    pub number_unread_alerts: u32,
}

impl WireRecord for UnreadStatusNotificationMessage {
    const MIN_LEN: usize = 14;
}

/// Completion of a control point command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResultMessage {
    pub remote_address: BdAddr,
    pub transaction_id: u32,
    pub status: u32,
    pub att_protocol_error_code: u32,
}

impl WireRecord for CommandResultMessage {
    const MIN_LEN: usize = 18;
}

/// Transport control message announcing a client (un)registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRegistrationMessage {
    pub address_id: u32,
    pub registered: bool,
}

impl WireRecord for ClientRegistrationMessage {
    const MIN_LEN: usize = 5;
}
