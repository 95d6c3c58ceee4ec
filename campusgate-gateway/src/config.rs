//! Gateway configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address browsers connect to.
    #[serde(with = "socket_addr_serde")]
    pub bind_addr: SocketAddr,
    /// Address of the record store.
    #[serde(with = "socket_addr_serde")]
    pub backend_addr: SocketAddr,
    /// Maximum concurrent client connections.
    pub max_connections: usize,
    /// Maximum concurrent backend round trips.
    pub max_backend_connections: usize,
    /// Largest accepted inbound frame payload.
    pub max_frame_bytes: usize,
    /// Backend connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Backend request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], crate::DEFAULT_PORT)),
            backend_addr: SocketAddr::from(([127, 0, 0, 1], campusgate_protocol::DEFAULT_PORT)),
            max_connections: 1000,
            max_backend_connections: 256,
            max_frame_bytes: crate::DEFAULT_MAX_FRAME_BYTES,
            connect_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
        }
    }
}

impl GatewayConfig {
    pub fn new(bind_addr: SocketAddr, backend_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            backend_addr,
            ..Default::default()
        }
    }

    /// Applies `CAMPUSGATE_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("CAMPUSGATE_BIND") {
            if let Ok(parsed) = addr.parse() {
                self.bind_addr = parsed;
            }
        }

        if let Ok(addr) = std::env::var("CAMPUSGATE_BACKEND") {
            if let Ok(parsed) = addr.parse() {
                self.backend_addr = parsed;
            }
        }

        if let Ok(max) = std::env::var("CAMPUSGATE_MAX_CONNECTIONS") {
            if let Ok(n) = max.parse() {
                self.max_connections = n;
            }
        }

        if let Ok(max) = std::env::var("CAMPUSGATE_MAX_BACKEND_CONNECTIONS") {
            if let Ok(n) = max.parse() {
                self.max_backend_connections = n;
            }
        }

        if let Ok(max) = std::env::var("CAMPUSGATE_MAX_FRAME_BYTES") {
            if let Ok(n) = max.parse() {
                self.max_frame_bytes = n;
            }
        }

        if let Ok(timeout) = std::env::var("CAMPUSGATE_CONNECT_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.connect_timeout_ms = ms;
            }
        }

        if let Ok(timeout) = std::env::var("CAMPUSGATE_REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.request_timeout_ms = ms;
            }
        }
    }

    /// Returns the backend connect timeout as Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the backend request timeout as Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Checks that every limit is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be greater than zero".to_string(),
            ));
        }
        if self.max_backend_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_backend_connections must be greater than zero".to_string(),
            ));
        }
        if self.max_frame_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_frame_bytes must be greater than zero".to_string(),
            ));
        }
        if self.connect_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "backend timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Gateway configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid gateway configuration: {0}")]
    Invalid(String),
}

/// Custom serde module for SocketAddr (to handle as string in YAML).
mod socket_addr_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::net::SocketAddr;

    pub fn serialize<S>(addr: &SocketAddr, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&addr.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
