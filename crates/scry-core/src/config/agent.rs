//! Agent configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::{duration_millis, duration_secs};

/// Configuration for the streaming agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Relay address to connect to
    pub relay_address: String,

    /// Shared secret presented at registration. Must match the relay's.
    pub shared_secret: String,

    /// Connection timeout for a single connect attempt
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Fixed delay between consecutive manual connection attempts
    #[serde(with = "duration_secs")]
    pub reconnect_delay: Duration,

    /// Capture-side frame rate. Independent of the relay's broadcast
    /// ceiling; excess frames are dropped at the relay.
    pub capture_fps: f64,

    /// Send frames in the legacy base64 text encoding instead of raw
    /// bytes. Higher overhead; only for old viewer frontends.
    pub legacy_text_frames: bool,

    /// Duration of the smoothed cursor animation for `move` commands.
    /// Zero disables smoothing entirely.
    #[serde(with = "duration_millis")]
    pub mouse_move_duration: Duration,

    /// Number of interpolation steps for a smoothed cursor move
    pub mouse_move_steps: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            relay_address: "localhost:7400".to_string(),
            shared_secret: String::new(),
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(3),
            capture_fps: 15.0,
            legacy_text_frames: false,
            mouse_move_duration: Duration::from_millis(25),
            mouse_move_steps: 3,
        }
    }
}

impl AgentConfig {
    /// Target time budget for one capture iteration
    pub fn capture_interval(&self) -> Duration {
        let fps = if self.capture_fps > 0.0 {
            self.capture_fps
        } else {
            Self::default().capture_fps
        };
        Duration::from_secs_f64(1.0 / fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_interval() {
        let mut config = AgentConfig::default();
        config.capture_fps = 10.0;
        assert_eq!(config.capture_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_defaults_parse_from_empty_toml() {
        let config: AgentConfig = toml::from_str("").unwrap();
        assert_eq!(config.relay_address, "localhost:7400");
        assert_eq!(config.mouse_move_steps, 3);
    }
}
