//! anp-protocol: Message formats for the Alert Notification Profile manager
//!
//! This crate defines the records exchanged between the ANP manager and the
//! platform server over the inter-process message transport: the common
//! message header, the group/function codes, the per-function payload
//! records, and a codec for carrying whole messages over a byte stream.

pub mod address;
pub mod alert;
pub mod codec;
pub mod error;
pub mod header;
pub mod message;
pub mod records;

pub use address::BdAddr;
pub use alert::{Category, CategoryMask, ConnectionType, NotificationType};
pub use codec::MessageCodec;
pub use error::ProtocolError;
pub use header::{MessageHeader, HEADER_SIZE, MAX_PAYLOAD_SIZE};
pub use message::{Message, MessageFunction, ANP_MESSAGE_GROUP};
pub use records::WireRecord;
