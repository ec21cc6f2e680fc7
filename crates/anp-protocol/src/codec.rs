//! Tokio codec for whole messages on a byte stream

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::header::{MessageHeader, HEADER_SIZE, MAX_PAYLOAD_SIZE};
use crate::message::Message;

/// Codec for encoding/decoding header-prefixed messages
#[derive(Debug, Default)]
pub struct MessageCodec {
    /// Current header being decoded (if any)
    pending_header: Option<MessageHeader>,
}

impl MessageCodec {
    /// Create a new codec
    pub fn new() -> Self {
        Self {
            pending_header: None,
        }
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let header = match self.pending_header.take() {
            Some(h) => h,
            None => {
                if src.len() < HEADER_SIZE {
                    src.reserve(HEADER_SIZE - src.len());
                    return Ok(None);
                }
                match MessageHeader::decode(src) {
                    Some(h) => h,
                    None => return Ok(None),
                }
            }
        };

        let payload_len = header.message_length as usize;
        if payload_len > MAX_PAYLOAD_SIZE {
            tracing::warn!(size = payload_len, "Rejecting oversized message");
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        if src.len() < payload_len {
            src.reserve(payload_len - src.len());
            self.pending_header = Some(header);
            return Ok(None);
        }

        let payload = src.split_to(payload_len).freeze();
        tracing::trace!(
            group = header.message_group,
            function = header.message_function,
            len = payload_len,
            "Decoded message"
        );
        Ok(Some(Message { header, payload }))
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = ProtocolError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload_len = message.payload.len();
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let mut header = message.header;
        header.message_length = payload_len as u32;
        header.encode(dst);
        dst.extend_from_slice(&message.payload);

        Ok(())
    }
}
