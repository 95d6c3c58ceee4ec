//! WebSocket upgrade handshake.
//!
//! Reads the client's HTTP upgrade request line by line up to the blank
//! line, extracts `Sec-WebSocket-Key`, and answers with `101 Switching
//! Protocols`. Only the key is inspected; other headers are ignored.

use crate::error::FrameError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// GUID appended to the client key before hashing.
pub const ACCEPT_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Largest upgrade request accepted, headers included.
pub const MAX_HANDSHAKE_BYTES: usize = 8 * 1024;

const KEY_HEADER: &str = "sec-websocket-key";

const BAD_REQUEST: &[u8] = b"HTTP/1.1 400 Bad Request\r\nConnection: close\r\n\r\n";

/// Upgrade request as read off the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeRequest {
    /// First line of the request, e.g. `GET / HTTP/1.1`.
    pub request_line: String,
    /// Value of `Sec-WebSocket-Key`, if present and non-empty.
    pub key: Option<String>,
}

/// Computes the `Sec-WebSocket-Accept` value for a client key.
pub fn accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(ACCEPT_GUID.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Builds the `101 Switching Protocols` response for an accept value.
pub fn switching_protocols(accept: &str) -> String {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\r\n",
        accept
    )
}

/// Reads request lines until the blank line that ends the headers.
pub async fn read_request<R>(reader: &mut R) -> Result<UpgradeRequest, FrameError>
where
    R: AsyncBufRead + Unpin,
{
    let mut request = UpgradeRequest::default();
    let mut consumed = 0usize;
    let mut first = true;
    let mut line = String::new();

    loop {
        line.clear();
        let remaining = (MAX_HANDSHAKE_BYTES - consumed) as u64;
        let n = (&mut *reader).take(remaining).read_line(&mut line).await?;
        if n == 0 {
            if consumed >= MAX_HANDSHAKE_BYTES {
                return Err(FrameError::HandshakeTooLarge(MAX_HANDSHAKE_BYTES));
            }
            return Err(FrameError::HandshakeClosed);
        }
        consumed += n;
        if !line.ends_with('\n') {
            // Either the limit cut the line short or the peer hung up mid-line.
            if consumed >= MAX_HANDSHAKE_BYTES {
                return Err(FrameError::HandshakeTooLarge(MAX_HANDSHAKE_BYTES));
            }
            return Err(FrameError::HandshakeClosed);
        }

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            return Ok(request);
        }

        if first {
            request.request_line = trimmed.to_string();
            first = false;
            continue;
        }

        if let Some((name, value)) = trimmed.split_once(':') {
            let value = value.trim();
            if name.trim().eq_ignore_ascii_case(KEY_HEADER) && !value.is_empty() {
                request.key = Some(value.to_string());
            }
        }
    }
}

/// Performs the server side of the upgrade on `stream`.
///
/// On success the `101` response has been written and flushed and the
/// accept value is returned. A request without a key is answered with
/// `400 Bad Request` and reported as [`FrameError::MissingKey`].
pub async fn negotiate<S>(stream: &mut S) -> Result<String, FrameError>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    let request = read_request(stream).await?;
    tracing::trace!("Upgrade request: {}", request.request_line);

    let Some(key) = request.key else {
        stream.write_all(BAD_REQUEST).await?;
        stream.flush().await?;
        return Err(FrameError::MissingKey);
    };

    let accept = accept_key(&key);
    stream
        .write_all(switching_protocols(&accept).as_bytes())
        .await?;
    stream.flush().await?;
    Ok(accept)
}
