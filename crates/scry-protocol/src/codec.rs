//! Tokio codec for length-prefixed protocol messages

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::header::{MessageHeader, MAX_PAYLOAD_SIZE};
use crate::message::Message;

/// Codec for encoding/decoding protocol messages
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
        // Try to decode a header if we don't have one parked
        let header = match self.pending_header.take() {
            Some(h) => h,
            None => match MessageHeader::decode(src)? {
                Some(h) => h,
                None => return Ok(None), // Need more data
            },
        };

        // Check payload length
        let payload_len = header.payload_length as usize;
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        // Check if we have enough data for the payload
        if src.len() < payload_len {
            // Park the header and wait for more data
            self.pending_header = Some(header);
            return Ok(None);
        }

        // Extract and deserialize the payload
        let payload_bytes = src.split_to(payload_len).freeze();
        let message: Message = bincode::deserialize(&payload_bytes)?;

        Ok(Some(message))
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = ProtocolError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = bincode::serialize(&message)?;
        let payload_len = payload.len();

        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let header = MessageHeader::new(message.message_type(), payload_len as u32);
        header.encode(dst);
        dst.extend_from_slice(&payload);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{ControlCommand, MouseButton};
    use crate::header::HEADER_SIZE;
    use bytes::Bytes;

    #[test]
    fn test_codec_roundtrip() {
        let mut codec = MessageCodec::new();

        let message = Message::RegisterAgent {
            token: "hunter2".to_string(),
        };

        let mut buf = BytesMut::new();
        codec.encode(message, &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(
            decoded,
            Message::RegisterAgent { token } if token == "hunter2"
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_frame_message() {
        let mut codec = MessageCodec::new();

        let message = Message::Frame(Bytes::from_static(b"frame payload"));

        let mut buf = BytesMut::new();
        codec.encode(message, &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        if let Message::Frame(data) = decoded {
            assert_eq!(data.as_ref(), b"frame payload");
        } else {
            panic!("Expected Frame message");
        }
    }

    #[test]
    fn test_codec_command_message() {
        let mut codec = MessageCodec::new();

        let message = Message::Command(ControlCommand::Click {
            button: MouseButton::Right,
            x: Some(10),
            y: Some(20),
        });

        let mut buf = BytesMut::new();
        codec.encode(message, &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        if let Message::Command(ControlCommand::Click { button, x, y }) = decoded {
            assert_eq!(button, MouseButton::Right);
            assert_eq!((x, y), (Some(10), Some(20)));
        } else {
            panic!("Expected Command message");
        }
    }

    #[test]
    fn test_codec_partial_read() {
        let mut codec = MessageCodec::new();

        let message = Message::Ping { timestamp: 12345 };

        let mut full_buf = BytesMut::new();
        codec.encode(message, &mut full_buf).unwrap();

        // Split the buffer to simulate a partial read
        let mut partial = full_buf.split_to(HEADER_SIZE - 1);

        // Should return None (need more data)
        assert!(codec.decode(&mut partial).unwrap().is_none());

        // Add the rest
        partial.extend_from_slice(&full_buf);

        // Now it should decode
        let decoded = codec.decode(&mut partial).unwrap().unwrap();
        if let Message::Ping { timestamp } = decoded {
            assert_eq!(timestamp, 12345);
        } else {
            panic!("Expected Ping message");
        }
    }

    #[test]
    fn test_codec_header_parked_until_payload_arrives() {
        let mut codec = MessageCodec::new();

        let message = Message::AgentPresent {
            message: "Remote screen connected".to_string(),
        };

        let mut full_buf = BytesMut::new();
        codec.encode(message, &mut full_buf).unwrap();

        // Deliver only the header; the payload arrives in a later read
        let mut partial = full_buf.split_to(HEADER_SIZE);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        partial.extend_from_slice(&full_buf);
        let decoded = codec.decode(&mut partial).unwrap().unwrap();
        assert!(matches!(decoded, Message::AgentPresent { .. }));
    }

    #[test]
    fn test_codec_back_to_back_messages() {
        let mut codec = MessageCodec::new();

        let mut buf = BytesMut::new();
        codec
            .encode(Message::Ping { timestamp: 1 }, &mut buf)
            .unwrap();
        codec
            .encode(Message::Pong { timestamp: 1 }, &mut buf)
            .unwrap();

        assert!(matches!(
            codec.decode(&mut buf).unwrap().unwrap(),
            Message::Ping { .. }
        ));
        assert!(matches!(
            codec.decode(&mut buf).unwrap().unwrap(),
            Message::Pong { .. }
        ));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }
}
