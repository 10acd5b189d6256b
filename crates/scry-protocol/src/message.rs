//! Message types for the scry relay protocol
//!
//! High-level protocol messages exchanged between the agent, the relay,
//! and viewer connections. Messages are serialized into length-prefixed
//! payloads using the codec defined in `codec.rs`.
//!
//! # Message Flow
//!
//! Typical sequence for a streaming session:
//!
//! 1. Agent connects and sends `RegisterAgent` with the shared secret
//! 2. Relay responds with `RegistrationSuccess` (or `RegistrationFail`
//!    followed by a forced disconnect)
//! 3. Viewers connect and send `Authenticate` with their web credential
//! 4. Relay broadcasts `AgentPresent` / `AgentAbsent` as the agent comes
//!    and goes
//! 5. Screen frames flow agent → relay → viewers (`Frame`, or the legacy
//!    base64 `FrameText`)
//! 6. Input commands flow viewer → relay → agent (`Command`); the relay
//!    answers `CommandError` when no agent is registered
//! 7. `Ping`/`Pong` carry liveness in both directions

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::command::ControlCommand;

/// Message type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Agent registration request (agent → relay)
    RegisterAgent = 0x01,
    /// Registration accepted
    RegistrationSuccess = 0x02,
    /// Registration rejected (followed by forced disconnect)
    RegistrationFail = 0x03,
    /// Viewer web-session authentication (viewer → relay)
    Authenticate = 0x04,
    /// An agent is streaming (relay → viewer)
    AgentPresent = 0x05,
    /// The agent went away (relay → viewer)
    AgentAbsent = 0x06,
    /// Screen frame, raw bytes
    Frame = 0x07,
    /// Screen frame, legacy base64 encoding
    FrameText = 0x08,
    /// Input command (viewer → relay → agent)
    Command = 0x09,
    /// Command could not be routed (relay → viewer)
    CommandError = 0x0A,
    /// Liveness ping
    Ping = 0x0B,
    /// Liveness ping reply
    Pong = 0x0C,
}

impl MessageType {
    /// Convert to u8
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::RegisterAgent),
            0x02 => Some(Self::RegistrationSuccess),
            0x03 => Some(Self::RegistrationFail),
            0x04 => Some(Self::Authenticate),
            0x05 => Some(Self::AgentPresent),
            0x06 => Some(Self::AgentAbsent),
            0x07 => Some(Self::Frame),
            0x08 => Some(Self::FrameText),
            0x09 => Some(Self::Command),
            0x0A => Some(Self::CommandError),
            0x0B => Some(Self::Ping),
            0x0C => Some(Self::Pong),
            _ => None,
        }
    }
}

/// Protocol messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    /// Agent registration.
    ///
    /// Sent by the agent immediately after the transport connects. The
    /// token is compared against the relay's configured shared secret.
    RegisterAgent {
        /// Shared secret token
        token: String,
    },

    /// Registration accepted
    RegistrationSuccess,

    /// Registration rejected. The relay force-disconnects the sender
    /// right after this message.
    RegistrationFail {
        /// Human-readable reason
        message: String,
    },

    /// Viewer web-session authentication. An accepted credential promotes
    /// the connection to viewer; a rejected one leaves it unauthenticated
    /// and its commands are dropped at dispatch time.
    Authenticate {
        /// Web-session credential
        credential: String,
    },

    /// An agent is registered and streaming
    AgentPresent {
        /// Status text for the viewer UI
        message: String,
    },

    /// No agent is registered
    AgentAbsent {
        /// Status text for the viewer UI
        message: String,
    },

    /// Screen frame as raw opaque bytes (preferred variant)
    Frame(Bytes),

    /// Screen frame as base64 text (legacy variant, functionally
    /// equivalent to `Frame`)
    FrameText {
        /// Base64-encoded frame bytes
        image: String,
    },

    /// Input command from a viewer
    Command(ControlCommand),

    /// Command could not be delivered (no agent registered)
    CommandError {
        /// Human-readable reason
        message: String,
    },

    /// Liveness ping
    Ping {
        /// Timestamp for latency measurement
        timestamp: u64,
    },

    /// Liveness ping reply
    Pong {
        /// Echo of the original timestamp
        timestamp: u64,
    },
}

impl Message {
    /// Get the message type for this message
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::RegisterAgent { .. } => MessageType::RegisterAgent,
            Message::RegistrationSuccess => MessageType::RegistrationSuccess,
            Message::RegistrationFail { .. } => MessageType::RegistrationFail,
            Message::Authenticate { .. } => MessageType::Authenticate,
            Message::AgentPresent { .. } => MessageType::AgentPresent,
            Message::AgentAbsent { .. } => MessageType::AgentAbsent,
            Message::Frame(_) => MessageType::Frame,
            Message::FrameText { .. } => MessageType::FrameText,
            Message::Command(_) => MessageType::Command,
            Message::CommandError { .. } => MessageType::CommandError,
            Message::Ping { .. } => MessageType::Ping,
            Message::Pong { .. } => MessageType::Pong,
        }
    }

    /// Whether this message carries a screen frame in either encoding
    pub fn is_frame(&self) -> bool {
        matches!(self, Message::Frame(_) | Message::FrameText { .. })
    }

    /// Build a legacy text frame from raw bytes
    pub fn text_frame(data: &[u8]) -> Self {
        Message::FrameText {
            image: BASE64.encode(data),
        }
    }

    /// Normalize either frame variant to raw bytes.
    ///
    /// Returns `None` for non-frame messages and for text frames whose
    /// base64 payload does not decode (such frames are dropped, not
    /// surfaced as errors).
    pub fn frame_payload(&self) -> Option<Bytes> {
        match self {
            Message::Frame(data) => Some(data.clone()),
            Message::FrameText { image } => BASE64.decode(image).ok().map(Bytes::from),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_roundtrip() {
        for msg_type in [
            MessageType::RegisterAgent,
            MessageType::RegistrationSuccess,
            MessageType::RegistrationFail,
            MessageType::Authenticate,
            MessageType::AgentPresent,
            MessageType::AgentAbsent,
            MessageType::Frame,
            MessageType::FrameText,
            MessageType::Command,
            MessageType::CommandError,
            MessageType::Ping,
            MessageType::Pong,
        ] {
            let byte = msg_type.as_u8();
            let recovered = MessageType::from_u8(byte).unwrap();
            assert_eq!(recovered, msg_type);
        }
    }

    #[test]
    fn test_frame_payload_binary() {
        let message = Message::Frame(Bytes::from_static(b"\xff\xd8\xff\xe0"));
        assert_eq!(
            message.frame_payload().unwrap().as_ref(),
            b"\xff\xd8\xff\xe0"
        );
    }

    #[test]
    fn test_frame_payload_text_roundtrip() {
        let message = Message::text_frame(b"jpeg bytes here");
        assert!(message.is_frame());
        assert_eq!(message.frame_payload().unwrap().as_ref(), b"jpeg bytes here");
    }

    #[test]
    fn test_frame_payload_bad_base64() {
        let message = Message::FrameText {
            image: "not!!valid@@base64".to_string(),
        };
        assert!(message.frame_payload().is_none());
    }

    #[test]
    fn test_frame_payload_non_frame() {
        let message = Message::Ping { timestamp: 1 };
        assert!(!message.is_frame());
        assert!(message.frame_payload().is_none());
    }
}
