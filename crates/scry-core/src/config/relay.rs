//! Relay configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::duration_secs;

/// Configuration for the relay daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address to bind the TCP listener to
    pub bind_address: String,

    /// Shared secret agents must present to register.
    ///
    /// Empty means "reject everything": the relay refuses all agent
    /// registrations and viewer credentials until a secret is configured.
    pub shared_secret: String,

    /// Target broadcast frame rate. Frames arriving faster than this are
    /// dropped, never queued.
    pub target_fps: f64,

    /// How often the relay pings each connection
    #[serde(with = "duration_secs")]
    pub ping_interval: Duration,

    /// How long a connection may go without answering a ping before it is
    /// force-disconnected
    #[serde(with = "duration_secs")]
    pub ping_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7400".to_string(),
            shared_secret: String::new(),
            target_fps: 15.0,
            ping_interval: Duration::from_secs(10),
            ping_timeout: Duration::from_secs(20),
        }
    }
}

impl RelayConfig {
    /// Minimum interval between two successful frame broadcasts,
    /// derived from the target frame rate.
    pub fn min_broadcast_interval(&self) -> Duration {
        let fps = if self.target_fps > 0.0 {
            self.target_fps
        } else {
            Self::default().target_fps
        };
        Duration::from_secs_f64(1.0 / fps)
    }
}
