//! Gateway error types.

use std::net::SocketAddr;
use thiserror::Error;

/// Failures of the client-facing wire protocol. The framing can no longer be
/// trusted after any of these, so the connection is dropped without a reply.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed during handshake")]
    HandshakeClosed,

    #[error("handshake request exceeds {0} bytes")]
    HandshakeTooLarge(usize),

    #[error("missing Sec-WebSocket-Key header")]
    MissingKey,

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: u64, max: usize },

    #[error("stream ended mid-frame after {received} bytes")]
    Truncated { received: usize },

    #[error("invalid UTF-8 in text frame")]
    InvalidUtf8,
}

/// Failures turning message text into a request. Reported to the client as a
/// `success: false` response; the connection stays open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscodeError {
    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("unexpected {found} at position {pos}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        pos: usize,
    },

    #[error("unterminated string starting at position {0}")]
    UnterminatedString(usize),

    #[error("integer out of range: {0}")]
    IntegerOutOfRange(String),

    #[error("trailing input at position {0}")]
    TrailingInput(usize),

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid field: {field} (expected {expected}, got {found})")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

/// Failures talking to the record store. Converted into a synthetic
/// `success: false` response by the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("connect to {0} timed out")]
    ConnectTimeout(SocketAddr),

    #[error("request timed out")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] campusgate_protocol::ProtocolError),

    #[error("backend closed the connection")]
    Closed,

    #[error("backend connection limiter closed")]
    Unavailable,
}

/// Errors that end a client connection or the accept loop.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("server shutting down")]
    ShuttingDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FrameError::FrameTooLarge { size: 100, max: 50 };
        assert!(err.to_string().contains("100"));

        let err = TranscodeError::UnexpectedToken {
            found: "':'".to_string(),
            expected: "value",
            pos: 7,
        };
        assert_eq!(err.to_string(), "unexpected ':' at position 7, expected value");

        let err = TranscodeError::MissingField("action");
        assert_eq!(err.to_string(), "missing required field: action");

        let err = BridgeError::ConnectTimeout("127.0.0.1:8888".parse().unwrap());
        assert!(err.to_string().contains("127.0.0.1:8888"));

        let err: GatewayError = FrameError::MissingKey.into();
        assert!(err.to_string().contains("Sec-WebSocket-Key"));
    }
}
