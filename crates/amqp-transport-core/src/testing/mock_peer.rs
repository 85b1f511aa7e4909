//! Mock AMQP peer for integration testing.
//!
//! A loopback TCP server that:
//! - Records every byte it receives
//! - Counts accepted connections
//! - Replies according to a [`PeerBehavior`]

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, RwLock};

use crate::config::TransportConfig;

/// What the peer does on each accepted connection.
#[derive(Debug, Clone)]
pub enum PeerBehavior {
    /// Write every received chunk straight back.
    Echo,
    /// Read and record, never reply.
    Silent,
    /// Reply once according to a script.
    Respond(PeerScript),
    /// Accept, then close the socket at once.
    CloseImmediately,
}

/// A one-shot scripted reply.
#[derive(Debug, Clone)]
pub struct PeerScript {
    /// Bytes to receive on the connection before replying.
    pub respond_after: usize,
    /// Reply payload.
    pub response: Bytes,
    /// Reply is written in chunks of at most this many bytes.
    pub chunk_size: usize,
    /// Pause before each chunk.
    pub chunk_delay: Duration,
    /// Close the connection once the reply is written.
    pub close_after_response: bool,
}

impl PeerScript {
    /// Reply with `response` once `respond_after` bytes were received.
    pub fn new(respond_after: usize, response: impl Into<Bytes>) -> Self {
        Self {
            respond_after,
            response: response.into(),
            chunk_size: usize::MAX,
            chunk_delay: Duration::ZERO,
            close_after_response: false,
        }
    }

    /// Split the reply into `chunk_size`-byte writes separated by `delay`.
    #[must_use]
    pub fn chunked(mut self, chunk_size: usize, delay: Duration) -> Self {
        self.chunk_size = chunk_size.max(1);
        self.chunk_delay = delay;
        self
    }

    /// Close the connection after the reply.
    #[must_use]
    pub fn close_after_response(mut self) -> Self {
        self.close_after_response = true;
        self
    }
}

/// Mock AMQP peer for testing.
pub struct MockPeer {
    address: SocketAddr,
    shutdown_tx: Option<broadcast::Sender<()>>,
    received: Arc<RwLock<Vec<u8>>>,
    connections: Arc<AtomicUsize>,
}

impl MockPeer {
    /// Start a peer on an ephemeral loopback port.
    ///
    /// # Errors
    ///
    /// Returns an error if binding fails.
    pub async fn start(behavior: PeerBehavior) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;

        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let received = Arc::new(RwLock::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let mut shutdown_rx = shutdown_tx.subscribe();
        let accept_shutdown = shutdown_tx.clone();
        let accept_received = Arc::clone(&received);
        let accept_connections = Arc::clone(&connections);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { break };
                        accept_connections.fetch_add(1, Ordering::SeqCst);
                        if matches!(behavior, PeerBehavior::CloseImmediately) {
                            drop(stream);
                            continue;
                        }

                        let behavior = behavior.clone();
                        let received = Arc::clone(&accept_received);
                        let shutdown_rx = accept_shutdown.subscribe();
                        tokio::spawn(async move {
                            Self::handle_connection(stream, behavior, received, shutdown_rx).await;
                        });
                    }
                }
            }
        });

        Ok(Self {
            address,
            shutdown_tx: Some(shutdown_tx),
            received,
            connections,
        })
    }

    /// The listening address.
    #[must_use]
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// The listening port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.address.port()
    }

    /// A transport configuration pointing at this peer.
    #[must_use]
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::new(self.address.ip().to_string(), self.port())
    }

    /// Everything received so far, across all connections, in arrival order.
    pub async fn received(&self) -> Vec<u8> {
        self.received.read().await.clone()
    }

    /// Wait until at least `len` bytes were received or `limit` elapses.
    ///
    /// Returns whether the length was reached.
    pub async fn wait_for_received(&self, len: usize, limit: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.received.read().await.len() >= len {
                return true;
            }
            if start.elapsed() >= limit {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Number of connections accepted so far.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Stop accepting and drop every open connection.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    async fn handle_connection(
        mut stream: TcpStream,
        behavior: PeerBehavior,
        received: Arc<RwLock<Vec<u8>>>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let mut buf = vec![0u8; 64 * 1024];
        let mut seen = 0usize;
        let mut responded = false;

        if let PeerBehavior::Respond(script) = &behavior {
            if script.respond_after == 0 {
                responded = true;
                if Self::send_script(&mut stream, script).await.is_err()
                    || script.close_after_response
                {
                    return;
                }
            }
        }

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                result = stream.read(&mut buf) => {
                    let n = match result {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    received.write().await.extend_from_slice(&buf[..n]);
                    seen += n;

                    match &behavior {
                        PeerBehavior::Echo => {
                            if stream.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                        PeerBehavior::Respond(script) if !responded && seen >= script.respond_after => {
                            responded = true;
                            if Self::send_script(&mut stream, script).await.is_err()
                                || script.close_after_response
                            {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    async fn send_script(stream: &mut TcpStream, script: &PeerScript) -> io::Result<()> {
        for chunk in script.response.chunks(script.chunk_size) {
            if !script.chunk_delay.is_zero() {
                tokio::time::sleep(script.chunk_delay).await;
            }
            stream.write_all(chunk).await?;
            stream.flush().await?;
        }
        Ok(())
    }
}

impl Drop for MockPeer {
    fn drop(&mut self) {
        self.stop();
    }
}
