//! Per-connection session state.

use std::net::SocketAddr;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Lifecycle of a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the HTTP upgrade request.
    AwaitingHandshake,
    /// Handshake done, exchanging frames.
    Ready,
    /// Connection finished. Terminal.
    Closed,
}

/// A client session.
pub struct Session {
    /// Unique session ID.
    pub id: String,

    /// Remote address.
    pub remote_addr: SocketAddr,

    state: ConnectionState,

    /// Messages received after the handshake.
    message_count: u64,

    created_at: Instant,
}

impl Session {
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            remote_addr,
            state: ConnectionState::AwaitingHandshake,
            message_count: 0,
            created_at: Instant::now(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Moves to `state`. A closed session stays closed.
    pub fn set_state(&mut self, state: ConnectionState) {
        if self.state != ConnectionState::Closed {
            self.state = state;
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    pub fn record_message(&mut self) -> u64 {
        self.message_count += 1;
        self.message_count
    }

    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Time since the connection was accepted.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut session = Session::new("127.0.0.1:5000".parse().unwrap());
        assert_eq!(session.state(), ConnectionState::AwaitingHandshake);
        assert!(!session.is_ready());

        session.set_state(ConnectionState::Ready);
        assert!(session.is_ready());
        assert_eq!(session.record_message(), 1);
        assert_eq!(session.record_message(), 2);

        session.set_state(ConnectionState::Closed);
        session.set_state(ConnectionState::Ready);
        assert_eq!(session.state(), ConnectionState::Closed);
        assert_eq!(session.message_count(), 2);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let addr = "127.0.0.1:5000".parse().unwrap();
        let a = Session::new(addr);
        let b = Session::new(addr);
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 36);
    }
}
