//! # campusgate-gateway
//!
//! Browser-facing gateway in front of the campusgate record store.
//!
//! This crate provides:
//! - The WebSocket upgrade handshake
//! - A hand-written frame codec for text messages
//! - A recursive-descent transcoder for the JSON-like message text
//! - A bridge that performs one backend round trip per message
//! - Per-connection handling and the accept loop

pub mod bridge;
pub mod config;
pub mod error;
pub mod frame;
pub mod handler;
pub mod handshake;
pub mod server;
pub mod session;
pub mod text;

pub use bridge::BackendBridge;
pub use config::{ConfigError, GatewayConfig};
pub use error::{BridgeError, FrameError, GatewayError, TranscodeError};
pub use frame::{Frame, FrameReader};
pub use handler::ConnectionHandler;
pub use server::{Server, ServerStats};
pub use session::{ConnectionState, Session};

/// Default port for the gateway.
pub const DEFAULT_PORT: u16 = 8080;

/// Default maximum inbound frame payload (16 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;
