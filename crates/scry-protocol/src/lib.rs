//! scry-protocol: Wire protocol for the scry screen relay
//!
//! This crate defines the binary protocol spoken between the relay,
//! the streaming agent, and viewer connections over TCP.

pub mod codec;
pub mod command;
pub mod error;
pub mod header;
pub mod message;

pub use codec::MessageCodec;
pub use command::{ControlCommand, MouseButton};
pub use error::ProtocolError;
pub use header::{MessageHeader, HEADER_SIZE, MAX_PAYLOAD_SIZE};
pub use message::{Message, MessageType};
