//! Per-message bridge to the record store.
//!
//! Every call opens a fresh TCP connection, writes one request frame, reads
//! one response frame, and closes. Failures never escape [`BackendBridge::call`];
//! they are folded into a `success: false` response.

use crate::config::GatewayConfig;
use crate::error::BridgeError;
use campusgate_protocol::{Decoder, Encoder, Request, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;

/// Prefix of the message returned when the backend cannot be reached.
pub const FAILURE_PREFIX: &str = "Failed to connect to backend: ";

/// Read buffer size for backend responses (8 KiB).
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Opens one backend connection per request.
#[derive(Clone)]
pub struct BackendBridge {
    addr: SocketAddr,
    connect_timeout: Duration,
    request_timeout: Duration,
    /// Caps concurrent backend connections across all client connections.
    permits: Arc<Semaphore>,
}

impl BackendBridge {
    /// Creates a bridge to `addr` with default limits.
    pub fn new(addr: SocketAddr) -> Self {
        let mut config = GatewayConfig::default();
        config.backend_addr = addr;
        Self::from_config(&config)
    }

    /// Creates a bridge from gateway configuration.
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            addr: config.backend_addr,
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
            permits: Arc::new(Semaphore::new(config.max_backend_connections)),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the number of backend connections that may still be opened.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Performs one round trip and always yields a response.
    pub async fn call(&self, request: &Request) -> Response {
        match self.try_call(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Backend call for {} failed: {}", request.action, e);
                Response::failure(format!("{}{}", FAILURE_PREFIX, e))
            }
        }
    }

    /// Performs one round trip, reporting failures to the caller.
    pub async fn try_call(&self, request: &Request) -> Result<Response, BridgeError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| BridgeError::Unavailable)?;

        tracing::debug!("Connecting to backend {}...", self.addr);
        let mut stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| BridgeError::ConnectTimeout(self.addr))?
            .map_err(|source| BridgeError::Connect {
                addr: self.addr,
                source,
            })?;
        stream.set_nodelay(true).ok();

        let bytes = Encoder::encode_request(request)?;
        tokio::time::timeout(self.request_timeout, Self::exchange(&mut stream, &bytes))
            .await
            .map_err(|_| BridgeError::Timeout)?
    }

    async fn exchange(stream: &mut TcpStream, bytes: &[u8]) -> Result<Response, BridgeError> {
        stream.write_all(bytes).await?;
        stream.flush().await?;

        let mut decoder = Decoder::new();
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        loop {
            if let Some(response) = decoder.decode_response()? {
                return Ok(response);
            }
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                return Err(BridgeError::Closed);
            }
            decoder.extend(&buf[..n]);
        }
    }
}
