//! # campusgate-store
//!
//! In-memory record store behind the campusgate backend protocol.
//!
//! This crate provides:
//! - Student and module records with the registration rules
//! - Request dispatch for every action in the catalog
//! - A TCP server speaking the framed backend protocol

pub mod config;
pub mod error;
pub mod handler;
pub mod server;
pub mod store;

pub use config::StoreConfig;
pub use error::{ServerError, StoreError};
pub use handler::RequestHandler;
pub use server::{ServerStats, StoreServer};
pub use store::{ModuleUpdate, RecordStore, StudentUpdate};
