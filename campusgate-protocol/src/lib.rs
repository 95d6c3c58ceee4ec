//! # campusgate-protocol
//!
//! Backend wire protocol shared by the gateway and the record store.
//!
//! This crate provides:
//! - Binary framing with length prefix and CRC32C validation
//! - Typed request/response messages and the student/module record shapes
//! - The structured `Value` type carried in request data
//! - The action catalog understood by the record store

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;
pub mod value;

pub use codec::{Decoder, Encoder};
pub use error::ProtocolError;
pub use frame::{Frame, FrameFlags, FRAME_HEADER_SIZE, MAGIC};
pub use message::{Action, Module, Payload, Request, Response, Student};
pub use value::{Map, Value};

/// Protocol version supported by this implementation.
pub const PROTOCOL_VERSION: u16 = 1;

/// Default port for the record store.
pub const DEFAULT_PORT: u16 = 8888;

/// Maximum frame payload size (16 MiB).
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;
