//! Launcher configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via CAMPUSGATE_CONFIG)
//! 3. Environment variables

use campusgate_gateway::{ConfigError as GatewayConfigError, GatewayConfig};
use campusgate_store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the YAML config file.
pub const CONFIG_ENV: &str = "CAMPUSGATE_CONFIG";

/// Environment variable naming a path to write the effective config to.
pub const WRITE_CONFIG_ENV: &str = "CAMPUSGATE_WRITE_CONFIG";

/// Process configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gateway configuration.
    pub gateway: GatewayConfig,
    /// Record store configuration.
    pub store: StoreConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        self.gateway.apply_env_overrides();
        self.store.apply_env_overrides();
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Rejects limits that would make the process unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.validate()?;

        if self.store.max_connections == 0 {
            return Err(ConfigError::Validation(
                "store: max_connections must be greater than zero".to_string(),
            ));
        }
        if self.gateway.bind_addr == self.store.bind_addr {
            return Err(ConfigError::Validation(format!(
                "gateway and store both bind {}",
                self.gateway.bind_addr
            )));
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error(transparent)]
    Gateway(#[from] GatewayConfigError),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}
