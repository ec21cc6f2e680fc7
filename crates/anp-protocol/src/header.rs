//! Message header encoding/decoding
//!
//! Every message starts with a 20-byte header of five little-endian u32s:
//! - address_id: transport endpoint the message is addressed to / came from
//! - message_id: 31-bit sequence number, top bit set on responses
//! - message_group: coarse routing key (one per manager module)
//! - message_function: operation within the group
//! - message_length: payload length in bytes (header excluded)

use bytes::{Buf, BufMut, BytesMut};

/// Size of the message header in bytes
pub const HEADER_SIZE: usize = 20;

/// Maximum payload size accepted by the codec
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// Bits of the message ID that carry the sequence number
pub const MESSAGE_ID_MASK: u32 = 0x7FFF_FFFF;

/// Bit of the message ID that marks a response
pub const MESSAGE_ID_RESPONSE_MASK: u32 = 0x8000_0000;

/// Lowest function code available to manager modules; codes below are
/// reserved for transport control messages
pub const MESSAGE_FUNCTION_MINIMUM: u32 = 0x0000_1000;

/// Routing and length information shared by every message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageHeader {
    /// Transport endpoint
    pub address_id: u32,
    /// Sequence number (with response bit)
    pub message_id: u32,
    /// Message group
    pub message_group: u32,
    /// Message function within the group
    pub message_function: u32,
    /// Payload length in bytes
    pub message_length: u32,
}

impl MessageHeader {
    /// Create a new header
    pub fn new(
        address_id: u32,
        message_id: u32,
        message_group: u32,
        message_function: u32,
        message_length: u32,
    ) -> Self {
        Self {
            address_id,
            message_id,
            message_group,
            message_function,
            message_length,
        }
    }

    /// Whether this header belongs to a response
    pub fn is_response(&self) -> bool {
        self.message_id & MESSAGE_ID_RESPONSE_MASK != 0
    }

    /// Whether the function code is a transport control function
    pub fn is_control(&self) -> bool {
        self.message_function < MESSAGE_FUNCTION_MINIMUM
    }

    /// Encode the header into a byte buffer
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE);
        dst.put_u32_le(self.address_id);
        dst.put_u32_le(self.message_id);
        dst.put_u32_le(self.message_group);
        dst.put_u32_le(self.message_function);
        dst.put_u32_le(self.message_length);
    }

    /// Decode a header from a byte buffer
    ///
    /// Returns None if there aren't enough bytes in the buffer.
    pub fn decode(src: &mut BytesMut) -> Option<Self> {
        if src.len() < HEADER_SIZE {
            return None;
        }

        Some(Self {
            address_id: src.get_u32_le(),
            message_id: src.get_u32_le(),
            message_group: src.get_u32_le(),
            message_function: src.get_u32_le(),
            message_length: src.get_u32_le(),
        })
    }
}
