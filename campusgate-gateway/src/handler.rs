//! Client connection handling.
//!
//! One handler serves one connection: the upgrade handshake, then a loop of
//! read frame, transcode, backend round trip, write frame. Transcode and
//! backend failures are answered and the loop continues; framing failures
//! end the connection.

use crate::bridge::BackendBridge;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::frame::{self, FrameReader};
use crate::handshake;
use crate::session::{ConnectionState, Session};
use crate::text;
use campusgate_protocol::Response;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;

/// Serves client connections against one backend.
#[derive(Clone)]
pub struct ConnectionHandler {
    bridge: BackendBridge,
    max_frame_bytes: usize,
}

impl ConnectionHandler {
    pub fn new(bridge: BackendBridge, max_frame_bytes: usize) -> Self {
        Self {
            bridge,
            max_frame_bytes,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(BackendBridge::from_config(config), config.max_frame_bytes)
    }

    pub fn bridge(&self) -> &BackendBridge {
        &self.bridge
    }

    /// Turns one inbound message into the outbound reply text.
    pub async fn process_message(&self, input: &str) -> String {
        let response = match text::decode_request(input) {
            Ok(request) => {
                tracing::debug!("Forwarding action {} to backend", request.action);
                self.bridge.call(&request).await
            }
            Err(e) => {
                tracing::debug!("Rejected message: {}", e);
                Response::failure(format!("Error: {}", e))
            }
        };
        text::encode_response(&response)
    }

    /// Serves `stream` until the client disconnects, a framing error occurs,
    /// or shutdown is signalled. The session ends in [`ConnectionState::Closed`].
    pub async fn run<S>(
        &self,
        stream: S,
        session: &mut Session,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), GatewayError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut stream = BufReader::new(stream);
        let result = self.serve(&mut stream, session, shutdown).await;
        session.set_state(ConnectionState::Closed);
        let _ = stream.shutdown().await;
        result
    }

    async fn serve<S>(
        &self,
        stream: &mut BufReader<S>,
        session: &mut Session,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), GatewayError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let addr = session.remote_addr;

        tokio::select! {
            result = handshake::negotiate(stream) => {
                result?;
            }
            _ = shutdown.recv() => return Err(GatewayError::ShuttingDown),
        }
        session.set_state(ConnectionState::Ready);
        tracing::info!("[{}] WebSocket handshake complete (session {})", addr, session.id);

        let mut reader = FrameReader::new(self.max_frame_bytes);
        loop {
            let message = tokio::select! {
                result = reader.read_text(stream) => result?,
                _ = shutdown.recv() => {
                    tracing::debug!("[{}] Shutdown signal received", addr);
                    return Err(GatewayError::ShuttingDown);
                }
            };

            let Some(message) = message else {
                tracing::debug!("[{}] Connection closed by client", addr);
                return Ok(());
            };

            let n = session.record_message();
            tracing::debug!("[{}] Message {}: {} bytes", addr, n, message.len());

            let reply = self.process_message(&message).await;
            frame::write_text(stream, &reply).await?;
        }
    }
}
