//! Core error types for scry

use scry_protocol::ProtocolError;
use std::path::PathBuf;
use thiserror::Error;

/// Agent-side link errors
#[derive(Error, Debug)]
pub enum LinkError {
    /// Connection attempt exceeded the configured timeout
    #[error("Connection to {address} timed out")]
    ConnectTimeout { address: String },

    /// Registration rejected by the relay (bad shared secret).
    ///
    /// Fatal for the connection attempt; the agent retries from scratch
    /// with backoff because it cannot tell a misconfigured secret from a
    /// transient relay-side failure.
    #[error("Registration rejected: {message}")]
    RegistrationRejected { message: String },

    /// The link closed mid-stream
    #[error("Link closed")]
    Closed,

    /// Protocol error on the wire
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Screen capture errors reported by a `FrameSource`
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The capture backend failed for this frame; the loop skips the
    /// frame and retries next interval.
    #[error("Capture failed: {0}")]
    Backend(String),

    /// The encoded frame exceeds what the wire can carry
    #[error("Frame too large: {size} bytes")]
    FrameTooLarge { size: usize },
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
