//! scry-core: Shared abstractions for the scry screen relay
//!
//! Configuration, domain types, error taxonomy, and the collaborator
//! traits that the relay and agent are wired against (screen capture,
//! input injection, viewer web authentication).

pub mod config;
pub mod error;
pub mod time;
pub mod traits;
pub mod types;

pub use error::{CaptureError, ConfigError, LinkError};
pub use types::{ConnectionId, ConnectionRole};
