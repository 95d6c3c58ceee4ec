//! TCP server for the record store.

use crate::config::StoreConfig;
use crate::error::ServerError;
use crate::handler::RequestHandler;
use crate::store::RecordStore;
use campusgate_protocol::{Decoder, Encoder};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub requests_total: AtomicU64,
    pub errors_total: AtomicU64,
}

/// Serves the record store over the backend protocol.
pub struct StoreServer {
    config: StoreConfig,
    handler: Arc<RequestHandler>,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
    running: AtomicBool,
}

impl StoreServer {
    /// Creates a new server over the given store.
    pub fn new(config: StoreConfig, store: Arc<RecordStore>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            handler: Arc::new(RequestHandler::new(store)),
            stats: Arc::new(ServerStats::default()),
            shutdown: shutdown_tx,
            running: AtomicBool::new(false),
        }
    }

    /// Binds the configured address and runs the server.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Runs the accept loop on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        self.running.store(true, Ordering::SeqCst);
        tracing::info!("Record store listening on {}", listener.local_addr()?);

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.spawn_connection(stream, addr),
                        Err(e) => tracing::error!("Accept error: {}", e),
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Record store shutting down");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        if self.stats.connections_active.load(Ordering::Relaxed)
            >= self.config.max_connections as u64
        {
            tracing::warn!("Connection limit reached, rejecting {}", addr);
            return;
        }

        self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
        self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

        let handler = self.handler.clone();
        let stats = self.stats.clone();
        let mut conn_shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            tracing::debug!("Backend client connected: {}", addr);

            let result =
                Self::handle_connection(stream, addr, &handler, &stats, &mut conn_shutdown).await;
            if let Err(e) = result {
                tracing::debug!("Connection {} error: {}", addr, e);
                stats.errors_total.fetch_add(1, Ordering::Relaxed);
            }

            stats.connections_active.fetch_sub(1, Ordering::Relaxed);
            tracing::debug!("Backend client disconnected: {}", addr);
        });
    }

    /// Serves requests on one connection until the peer closes it.
    async fn handle_connection(
        mut stream: TcpStream,
        addr: SocketAddr,
        handler: &RequestHandler,
        stats: &ServerStats,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let mut decoder = Decoder::new();
        let mut buf = [0u8; 8192];

        loop {
            tokio::select! {
                result = stream.read(&mut buf) => {
                    match result {
                        Ok(0) => return Ok(()),
                        Ok(n) => decoder.extend(&buf[..n]),
                        Err(e) => return Err(ServerError::Io(e)),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("[{}] Shutdown signal received", addr);
                    return Ok(());
                }
            }

            while let Some(request) = decoder.decode_request()? {
                stats.requests_total.fetch_add(1, Ordering::Relaxed);
                tracing::info!("[{}] Processing action: {}", addr, request.action);

                let response = handler.handle(&request);
                let bytes = Encoder::encode_response(&response)?;
                stream.write_all(&bytes).await?;
            }
        }
    }

    /// Initiates server shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// Returns whether the server is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns server statistics.
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }
}
