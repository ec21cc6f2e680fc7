//! Whole messages: header plus raw payload
//!
//! The manager module owns message group [`ANP_MESSAGE_GROUP`]. Function codes
//! in `0x1000..0x2000` are requests from the local (server role) API, codes in
//! `0x2000..0x10000` are requests from the client role API, and codes from
//! `0x10000` up are asynchronous events pushed by the platform server.
//! Function codes below `0x1000` are transport control messages shared by
//! every group.

use bytes::Bytes;

use crate::error::ProtocolError;
use crate::header::{MessageHeader, MESSAGE_ID_RESPONSE_MASK};
use crate::records::WireRecord;

/// Message group owned by the ANP manager
pub const ANP_MESSAGE_GROUP: u32 = 0x0000_1101;

/// Transport control function: a client registered or went away
pub const CONTROL_CLIENT_REGISTRATION: u32 = 0x0000_0001;

/// Transport control function: the server could not deliver a message
pub const CONTROL_CLIENT_ERROR: u32 = 0x0000_0011;

/// Function codes of the ANP message group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageFunction {
    RegisterAnpEvents = 0x0000_1001,
    UnregisterAnpEvents = 0x0000_1002,
    SetNewAlert = 0x0000_1103,
    SetUnreadAlert = 0x0000_1104,
    RegisterAnpClientEvents = 0x0000_2001,
    UnregisterAnpClientEvents = 0x0000_2002,
    GetSupportedCategories = 0x0000_2101,
    EnableDisableNotifications = 0x0000_2102,
    EnableDisableCategory = 0x0000_2103,
    RequestNotification = 0x0000_2104,
    Connected = 0x0001_0001,
    Disconnected = 0x0001_0002,
    NewAlertCategoryEnabled = 0x0001_1003,
    NewAlertCategoryDisabled = 0x0001_1004,
    UnreadAlertCategoryEnabled = 0x0001_1005,
    UnreadAlertCategoryDisabled = 0x0001_1006,
    SupportedNewAlertCategoriesResult = 0x0002_0001,
    SupportedUnreadCategoriesResult = 0x0002_0002,
    NewAlertNotification = 0x0002_0003,
    UnreadStatusNotification = 0x0002_0004,
    CommandResult = 0x0002_0005,
}

impl MessageFunction {
    /// Convert to u32
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// Convert from u32
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0x0000_1001 => Some(Self::RegisterAnpEvents),
            0x0000_1002 => Some(Self::UnregisterAnpEvents),
            0x0000_1103 => Some(Self::SetNewAlert),
            0x0000_1104 => Some(Self::SetUnreadAlert),
            0x0000_2001 => Some(Self::RegisterAnpClientEvents),
            0x0000_2002 => Some(Self::UnregisterAnpClientEvents),
            0x0000_2101 => Some(Self::GetSupportedCategories),
            0x0000_2102 => Some(Self::EnableDisableNotifications),
            0x0000_2103 => Some(Self::EnableDisableCategory),
            0x0000_2104 => Some(Self::RequestNotification),
            0x0001_0001 => Some(Self::Connected),
            0x0001_0002 => Some(Self::Disconnected),
            0x0001_1003 => Some(Self::NewAlertCategoryEnabled),
            0x0001_1004 => Some(Self::NewAlertCategoryDisabled),
            0x0001_1005 => Some(Self::UnreadAlertCategoryEnabled),
            0x0001_1006 => Some(Self::UnreadAlertCategoryDisabled),
            0x0002_0001 => Some(Self::SupportedNewAlertCategoriesResult),
            0x0002_0002 => Some(Self::SupportedUnreadCategoriesResult),
            0x0002_0003 => Some(Self::NewAlertNotification),
            0x0002_0004 => Some(Self::UnreadStatusNotification),
            0x0002_0005 => Some(Self::CommandResult),
            _ => None,
        }
    }

    /// Whether this function is pushed by the server rather than requested
    pub fn is_event(&self) -> bool {
        self.as_u32() >= 0x0001_0000
    }
}

/// A complete message as handed to and from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Routing header; `message_length` always equals `payload.len()`
    pub header: MessageHeader,
    /// Raw payload bytes
    pub payload: Bytes,
}

impl Message {
    /// Create a message from a header and a payload, fixing up the length
    pub fn new(mut header: MessageHeader, payload: Bytes) -> Self {
        header.message_length = payload.len() as u32;
        Self { header, payload }
    }

    /// Build a message in `group` carrying an encoded record
    pub fn encode<T: WireRecord>(
        address_id: u32,
        message_id: u32,
        group: u32,
        function: u32,
        record: &T,
    ) -> Result<Self, ProtocolError> {
        let payload = bincode::serialize(record)?;
        Ok(Self::new(
            MessageHeader::new(address_id, message_id, group, function, 0),
            Bytes::from(payload),
        ))
    }

    /// Build an ANP request message
    pub fn encode_request<T: WireRecord>(
        address_id: u32,
        message_id: u32,
        function: MessageFunction,
        record: &T,
    ) -> Result<Self, ProtocolError> {
        Self::encode(
            address_id,
            message_id,
            ANP_MESSAGE_GROUP,
            function.as_u32(),
            record,
        )
    }

    /// Build the response to this message carrying an encoded record
    pub fn response_to<T: WireRecord>(&self, record: &T) -> Result<Self, ProtocolError> {
        Self::encode(
            self.header.address_id,
            self.header.message_id | MESSAGE_ID_RESPONSE_MASK,
            self.header.message_group,
            self.header.message_function,
            record,
        )
    }

    /// Whether this message is a response
    pub fn is_response(&self) -> bool {
        self.header.is_response()
    }

    /// Message group
    pub fn group(&self) -> u32 {
        self.header.message_group
    }

    /// Function code, if it belongs to the ANP group vocabulary
    pub fn function(&self) -> Option<MessageFunction> {
        MessageFunction::from_u32(self.header.message_function)
    }

    /// Length of the payload as far as both the header and the buffer agree
    pub fn payload_len(&self) -> usize {
        (self.header.message_length as usize).min(self.payload.len())
    }

    /// Decode the payload as `T`
    ///
    /// Fails with [`ProtocolError::Truncated`] when the payload cannot hold
    /// the record's fixed fields, and with a serialization error when a
    /// variable-length tail overruns the payload.
    pub fn decode<T: WireRecord>(&self) -> Result<T, ProtocolError> {
        let len = self.payload_len();
        if len < T::MIN_LEN {
            return Err(ProtocolError::Truncated {
                function: self.header.message_function,
                expected: T::MIN_LEN,
                actual: len,
            });
        }
        Ok(bincode::deserialize(&self.payload[..len])?)
    }
}
