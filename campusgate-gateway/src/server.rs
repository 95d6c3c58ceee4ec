//! Gateway accept loop.

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::handler::ConnectionHandler;
use crate::session::Session;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub connections_rejected: AtomicU64,
    pub messages_total: AtomicU64,
    pub errors_total: AtomicU64,
}

/// WebSocket gateway server.
pub struct Server {
    config: GatewayConfig,
    handler: ConnectionHandler,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
    running: AtomicBool,
}

impl Server {
    /// Creates a new server.
    pub fn new(config: GatewayConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            handler: ConnectionHandler::from_config(&config),
            config,
            stats: Arc::new(ServerStats::default()),
            shutdown: shutdown_tx,
            running: AtomicBool::new(false),
        }
    }

    /// Binds the configured address and runs the server.
    pub async fn run(&self) -> Result<(), GatewayError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Runs the accept loop on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GatewayError> {
        self.running.store(true, Ordering::SeqCst);
        tracing::info!(
            "Gateway listening on {} (backend {})",
            listener.local_addr()?,
            self.config.backend_addr
        );

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
                    tracing::info!("Gateway shutting down");
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
            self.stats
                .connections_rejected
                .fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
        self.stats.connections_active.fetch_add(1, Ordering::Relaxed);
        stream.set_nodelay(true).ok();

        let handler = self.handler.clone();
        let stats = self.stats.clone();
        let mut conn_shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut session = Session::new(addr);
            tracing::info!("Client connected: {}", addr);

            match handler.run(stream, &mut session, &mut conn_shutdown).await {
                Ok(()) | Err(GatewayError::ShuttingDown) => {}
                Err(e) => {
                    tracing::debug!("Connection {} error: {}", addr, e);
                    stats.errors_total.fetch_add(1, Ordering::Relaxed);
                }
            }

            stats
                .messages_total
                .fetch_add(session.message_count(), Ordering::Relaxed);
            stats.connections_active.fetch_sub(1, Ordering::Relaxed);
            tracing::info!(
                "Client disconnected: {} ({} messages in {:?})",
                addr,
                session.message_count(),
                session.age()
            );
        });
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

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, FrameReader};
    use campusgate_store::{RecordStore, StoreConfig, StoreServer};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn start_store() -> (Arc<StoreServer>, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(StoreServer::new(
            StoreConfig::new(addr),
            Arc::new(RecordStore::seeded()),
        ));
        let runner = server.clone();
        tokio::spawn(async move { runner.serve(listener).await });
        (server, addr)
    }

    async fn start_gateway(config: GatewayConfig) -> (Arc<Server>, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(Server::new(config));
        let runner = server.clone();
        tokio::spawn(async move { runner.serve(listener).await });
        (server, addr)
    }

    /// Connects, upgrades, and returns the stream positioned at the first frame.
    async fn connect_ws(addr: SocketAddr) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(
                b"GET / HTTP/1.1\r\nHost: localhost\r\nUpgrade: websocket\r\n\
                  Connection: Upgrade\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n",
            )
            .await
            .unwrap();

        // Read byte by byte so no frame data is swallowed with the headers.
        let mut head = Vec::new();
        while !head.ends_with(b"\r\n\r\n") {
            head.push(stream.read_u8().await.unwrap());
        }
        let head = String::from_utf8(head).unwrap();
        assert!(head.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(head.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
        stream
    }

    async fn exchange(stream: &mut TcpStream, reader: &mut FrameReader, text: &str) -> String {
        let frame = Frame::text(text).with_mask([9, 8, 7, 6]);
        stream.write_all(&frame.encode()).await.unwrap();
        reader.read_text(stream).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_over_tcp() {
        let (store, backend) = start_store().await;
        let mut config = GatewayConfig::default();
        config.backend_addr = backend;
        let (gateway, addr) = start_gateway(config).await;

        let mut stream = connect_ws(addr).await;
        let mut reader = FrameReader::new(1 << 20);

        let reply = exchange(
            &mut stream,
            &mut reader,
            r#"{"action":"REGISTER_MODULE","data":{"studentId":"S001","moduleCode":"CS201"}}"#,
        )
        .await;
        assert_eq!(reply, r#"{"success":true,"message":"Module registered successfully"}"#);

        let reply = exchange(
            &mut stream,
            &mut reader,
            r#"{"action":"VIEW_REGISTERED_MODULES","data":{"studentId":"S001"}}"#,
        )
        .await;
        assert!(reply.contains(r#""data":[{"moduleCode":"CS201""#), "{}", reply);

        drop(stream);
        for _ in 0..50 {
            if gateway.stats().connections_active.load(Ordering::Relaxed) == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(gateway.stats().connections_total.load(Ordering::Relaxed), 1);
        assert_eq!(gateway.stats().messages_total.load(Ordering::Relaxed), 2);

        gateway.shutdown();
        store.shutdown();
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let mut config = GatewayConfig::default();
        config.max_connections = 1;
        let (gateway, addr) = start_gateway(config).await;

        let _first = connect_ws(addr).await;

        let mut second = TcpStream::connect(addr).await.unwrap();
        let mut buf = [0u8; 16];
        // The rejected socket is closed without a reply.
        let n = second.read(&mut buf).await.unwrap_or(0);
        assert_eq!(n, 0);
        assert_eq!(
            gateway.stats().connections_rejected.load(Ordering::Relaxed),
            1
        );
        gateway.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_stops_accept_loop() {
        let (gateway, _addr) = start_gateway(GatewayConfig::default()).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(gateway.is_running());

        gateway.shutdown();
        for _ in 0..50 {
            if !gateway.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!gateway.is_running());
    }
}
