//! Configuration management for scry

mod agent;
mod relay;
pub mod serde_utils;

pub use agent::AgentConfig;
pub use relay::RelayConfig;

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scry")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a file
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_config() {
        let result: Result<RelayConfig, _> = load_config(Path::new("/nonexistent/scry.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_relay_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");

        let mut config = RelayConfig::default();
        config.shared_secret = "top-secret".to_string();
        config.target_fps = 20.0;

        save_config(&path, &config).unwrap();
        let loaded: RelayConfig = load_config(&path).unwrap();

        assert_eq!(loaded.shared_secret, "top-secret");
        assert_eq!(loaded.target_fps, 20.0);
        assert_eq!(loaded.bind_address, config.bind_address);
    }

    #[test]
    fn test_agent_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.toml");

        let mut config = AgentConfig::default();
        config.relay_address = "relay.example.net:7400".to_string();

        save_config(&path, &config).unwrap();
        let loaded: AgentConfig = load_config(&path).unwrap();

        assert_eq!(loaded.relay_address, "relay.example.net:7400");
        assert_eq!(loaded.reconnect_delay, config.reconnect_delay);
    }
}
