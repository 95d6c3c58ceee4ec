//! Record store configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Record store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Address to bind to.
    #[serde(with = "socket_addr_serde")]
    pub bind_addr: SocketAddr,
    /// Load the sample students and modules at startup.
    pub seed: bool,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], campusgate_protocol::DEFAULT_PORT)),
            seed: true,
            max_connections: 1000,
        }
    }
}

impl StoreConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Applies `CAMPUSGATE_STORE_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("CAMPUSGATE_STORE_BIND") {
            if let Ok(parsed) = addr.parse() {
                self.bind_addr = parsed;
            }
        }

        if let Ok(seed) = std::env::var("CAMPUSGATE_STORE_SEED") {
            self.seed = seed == "1" || seed.to_lowercase() == "true";
        }

        if let Ok(max) = std::env::var("CAMPUSGATE_STORE_MAX_CONNECTIONS") {
            if let Ok(n) = max.parse() {
                self.max_connections = n;
            }
        }
    }
}

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
