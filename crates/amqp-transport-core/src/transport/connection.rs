//! Byte-exact transport over a single broker socket.
//!
//! [`Transport`] owns the socket and exposes the two primitives the framing
//! layer needs: read exactly `n` bytes, and write all of a buffer. Every read
//! attempt also evaluates heartbeat liveness, which may write a heartbeat frame
//! or replace the socket with a fresh connection.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use socket2::SockRef;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::TransportConfig;
use crate::error::{TransportError, TransportResult};
use crate::frame::{heartbeat_frame, HeartbeatFrameFn};
use crate::liveness::{LivenessAction, LivenessMonitor};
use crate::metrics::TransportMetrics;
use crate::tls::TlsConnector;
use crate::wait::{WaitInterrupt, WaitMultiplexer, WaitOutcome};

use super::endpoint::{Endpoint, Scheme};
use super::stream::AmqpStream;

/// How the transport waits for incoming data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketMode {
    /// Non-blocking read attempts; idle time is spent in an interruptible
    /// readiness wait. Nagle's algorithm is disabled.
    Cooperative,
    /// Each read awaits data directly, bounded by the read/write timeout and,
    /// with heartbeats on, sliced at half the interval for liveness checks.
    Blocking,
}

enum ReadAttempt {
    Data(usize),
    /// Cooperative mode: nothing buffered yet.
    Empty,
    /// Blocking mode: a heartbeat slice passed without data.
    Idle,
    Eof,
}

/// A connection-oriented transport to one AMQP broker.
///
/// Created unconnected; [`connect`](Self::connect) acquires the socket and
/// [`close`](Self::close) releases it. The configuration never changes, so
/// [`reconnect`](Self::reconnect) always targets the same endpoint.
pub struct Transport {
    config: TransportConfig,
    tls_connector: Option<Arc<TlsConnector>>,
    stream: Option<AmqpStream>,
    io_timeout: Option<Duration>,
    timed_out: bool,
    liveness: LivenessMonitor,
    waiter: WaitMultiplexer,
    heartbeat_frame: HeartbeatFrameFn,
    generation: u64,
    metrics: Option<Arc<TransportMetrics>>,
}

impl Transport {
    /// Create a transport (not yet connected).
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        let liveness = LivenessMonitor::new(config.heartbeat_interval());
        Self {
            config,
            tls_connector: None,
            stream: None,
            io_timeout: None,
            timed_out: false,
            liveness,
            waiter: WaitMultiplexer::default(),
            heartbeat_frame,
            generation: 0,
            metrics: None,
        }
    }

    /// Create a transport and connect it.
    ///
    /// # Errors
    ///
    /// Returns the error from [`connect`](Self::connect).
    pub async fn open(config: TransportConfig) -> TransportResult<Self> {
        let mut transport = Self::new(config);
        transport.connect().await?;
        Ok(transport)
    }

    /// Use a caller-supplied TLS connector. The endpoint becomes `ssl://`.
    #[must_use]
    pub fn with_tls_connector(mut self, connector: TlsConnector) -> Self {
        self.tls_connector = Some(Arc::new(connector));
        self
    }

    /// Listen to the given interrupt handle while idle.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: WaitInterrupt) -> Self {
        self.waiter = WaitMultiplexer::new(interrupt);
        self
    }

    /// Replace the heartbeat frame producer.
    #[must_use]
    pub fn with_heartbeat_frame(mut self, producer: HeartbeatFrameFn) -> Self {
        self.heartbeat_frame = producer;
        self
    }

    /// Report traffic and lifecycle events to `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<TransportMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The transport configuration.
    #[must_use]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// The `tcp://` or `ssl://` endpoint this transport connects to.
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        let scheme = if self.tls_connector.is_some() || self.config.tls.is_some() {
            Scheme::Ssl
        } else {
            Scheme::Tcp
        };
        Endpoint::new(scheme, self.config.host(), self.config.port)
    }

    /// The socket mode selected by configuration.
    #[must_use]
    pub fn mode(&self) -> SocketMode {
        if self.config.cooperative {
            SocketMode::Cooperative
        } else {
            SocketMode::Blocking
        }
    }

    /// Check if the socket is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Number of successful connects so far.
    ///
    /// Upper layers compare this across calls to notice that a liveness
    /// reconnect replaced the connection and the session must be renegotiated.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Time of the last non-empty read on the current connection.
    #[must_use]
    pub fn last_read(&self) -> Option<Instant> {
        self.liveness.last_read()
    }

    /// Time of the last completed write on the current connection.
    #[must_use]
    pub fn last_write(&self) -> Option<Instant> {
        self.liveness.last_write()
    }

    /// Whether an I/O attempt on the current socket has timed out.
    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        self.timed_out
    }

    /// The raw socket handle, if connected.
    ///
    /// Do not hold on to it across [`reconnect`](Self::reconnect).
    #[must_use]
    pub fn stream(&self) -> Option<&AmqpStream> {
        self.stream.as_ref()
    }

    /// Mutable access to the raw socket handle, if connected.
    pub fn stream_mut(&mut self) -> Option<&mut AmqpStream> {
        self.stream.as_mut()
    }

    /// Address of the connected peer.
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.as_ref().and_then(|s| s.tcp().peer_addr().ok())
    }

    /// Handle that interrupts this transport's idle waits.
    #[must_use]
    pub fn interrupt_handle(&self) -> WaitInterrupt {
        self.waiter.interrupt_handle()
    }

    /// Open the socket.
    ///
    /// Any socket already held is closed first.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Connection`] if the endpoint cannot be reached within
    ///   the connect timeout, or the TLS handshake fails.
    /// - [`TransportError::IoSetup`] if the read/write timeout, the socket mode
    ///   or keepalive cannot be applied.
    #[instrument(skip(self), fields(endpoint = %self.endpoint(), mode = ?self.mode()))]
    pub async fn connect(&mut self) -> TransportResult<()> {
        self.close();

        let endpoint = self.endpoint();
        let remote = endpoint.to_string();
        let connection_error = |message: String| TransportError::Connection {
            endpoint: remote.clone(),
            code: None,
            message,
        };

        let connect_timeout = self
            .config
            .connection_timeout_duration()
            .map_err(|e| self.fail(connection_error(e.to_string())))?;

        let tcp = match timeout(
            connect_timeout,
            TcpStream::connect((endpoint.host.as_str(), endpoint.port)),
        )
        .await
        {
            Ok(Ok(tcp)) => tcp,
            Ok(Err(e)) => {
                warn!(error = %e, "failed to connect to broker");
                return Err(self.fail(TransportError::connection(&remote, &e)));
            }
            Err(_) => {
                warn!("connection timeout");
                return Err(self.fail(connection_error("connection timed out".to_string())));
            }
        };

        let peer = tcp.peer_addr().map_err(|e| {
            self.fail(TransportError::Connection {
                endpoint: remote.clone(),
                code: e.raw_os_error(),
                message: format!("connection refused: {e}"),
            })
        })?;
        debug!(%peer, "TCP connection established");

        let io_timeout = self.config.read_write_timeout_duration().map_err(|e| {
            self.fail(TransportError::IoSetup(format!("timeout could not be set: {e}")))
        })?;

        if self.mode() == SocketMode::Cooperative {
            tcp.set_nodelay(true).map_err(|e| {
                self.fail(TransportError::IoSetup(format!(
                    "could not disable write buffering: {e}"
                )))
            })?;
        }

        if self.config.keepalive {
            SockRef::from(&tcp).set_keepalive(true).map_err(|e| {
                self.fail(TransportError::IoSetup(format!(
                    "can not enable keepalive: {e}"
                )))
            })?;
        }

        let stream = if endpoint.is_tls() {
            let connector = self
                .tls_connector()
                .map_err(|e| self.fail(connection_error(e.to_string())))?;
            debug!("performing TLS handshake");
            let tls = connector
                .connect(&endpoint.host, tcp)
                .await
                .map_err(|e| self.fail(connection_error(e.to_string())))?;
            debug!("TLS handshake completed");
            AmqpStream::tls(tls)
        } else {
            AmqpStream::plain(tcp)
        };

        self.stream = Some(stream);
        self.io_timeout = (!io_timeout.is_zero()).then_some(io_timeout);
        self.timed_out = false;
        self.liveness.reset();
        self.generation += 1;
        if let Some(metrics) = &self.metrics {
            metrics.record_connect();
        }

        info!(generation = self.generation, "connected to broker");
        Ok(())
    }

    /// Close the socket, then connect again with the same configuration.
    ///
    /// # Errors
    ///
    /// Returns the error from [`connect`](Self::connect).
    pub async fn reconnect(&mut self) -> TransportResult<()> {
        self.close();
        self.connect().await
    }

    /// Release the socket. Safe to call when already closed.
    pub fn close(&mut self) {
        self.liveness.reset();
        if let Some(stream) = self.stream.take() {
            drop(stream);
            if let Some(metrics) = &self.metrics {
                metrics.record_close();
            }
            debug!(endpoint = %self.endpoint(), "socket closed");
        }
    }

    /// Read exactly `n` bytes.
    ///
    /// Partial deliveries are accumulated until `n` bytes arrived. Heartbeat
    /// liveness is evaluated before every attempt.
    ///
    /// # Errors
    ///
    /// - [`TransportError::ShortRead`] if the stream ends, errors or times out
    ///   before `n` bytes arrived, or if a liveness reconnect discarded bytes
    ///   already collected. The session cannot continue after this.
    /// - Any error from a liveness-triggered heartbeat write or reconnect.
    pub async fn read(&mut self, n: usize) -> TransportResult<Bytes> {
        let mut buf = vec![0u8; n];
        let mut received = 0;
        let mut generation = self.generation;
        let mut idle_since = Instant::now();

        while received < n {
            self.check_heartbeat().await?;
            if self.generation != generation {
                if received > 0 {
                    warn!(received, expected = n, "connection replaced mid-read");
                    return Err(self.short_read(received, n));
                }
                generation = self.generation;
                idle_since = Instant::now();
            }

            match self.read_chunk(&mut buf[received..], idle_since).await {
                Ok(ReadAttempt::Data(count)) => {
                    received += count;
                    idle_since = Instant::now();
                    self.liveness.record_read(Instant::now());
                    if let Some(metrics) = &self.metrics {
                        metrics.record_bytes_read(count);
                    }
                    trace!(count, received, expected = n, "read chunk");
                }
                Ok(ReadAttempt::Empty) => {
                    let deadline = self.liveness.wait_slice();
                    match self.wait(deadline).await {
                        Ok(outcome) => trace!(?outcome, "idle wait returned"),
                        Err(e) => {
                            debug!(error = %e, "readiness wait failed");
                            return Err(self.short_read(received, n));
                        }
                    }
                }
                Ok(ReadAttempt::Idle) => trace!("no data within heartbeat slice"),
                Ok(ReadAttempt::Eof) => {
                    debug!(received, expected = n, "end of stream");
                    return Err(self.short_read(received, n));
                }
                Err(e) => {
                    debug!(error = %e, received, expected = n, "read failed");
                    return Err(self.short_read(received, n));
                }
            }
        }

        Ok(Bytes::from(buf))
    }

    /// One read attempt.
    ///
    /// In blocking mode the attempt is bounded by whatever is left of the I/O
    /// timeout since `idle_since`, and by the heartbeat slice so liveness is
    /// re-evaluated while the peer is quiet. Only the I/O timeout is an error.
    async fn read_chunk(
        &mut self,
        buf: &mut [u8],
        idle_since: Instant,
    ) -> io::Result<ReadAttempt> {
        let mode = self.mode();
        let io_left = self
            .io_timeout
            .map(|limit| limit.saturating_sub(idle_since.elapsed()));
        let slice = self.liveness.wait_slice();
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;

        let count = match mode {
            SocketMode::Cooperative => match stream.try_read_chunk(buf)? {
                Some(count) => count,
                None => return Ok(ReadAttempt::Empty),
            },
            SocketMode::Blocking => {
                let (bound, io_bound) = match (io_left, slice) {
                    (Some(io), Some(slice)) if slice < io => (Some(slice), false),
                    (Some(io), _) => (Some(io), true),
                    (None, slice) => (slice, false),
                };
                match bound {
                    None => stream.read(buf).await?,
                    Some(bound) => match timeout(bound, stream.read(buf)).await {
                        Ok(result) => result?,
                        Err(_) if io_bound => {
                            self.timed_out = true;
                            return Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out"));
                        }
                        Err(_) => return Ok(ReadAttempt::Idle),
                    },
                }
            }
        };

        Ok(if count == 0 {
            ReadAttempt::Eof
        } else {
            ReadAttempt::Data(count)
        })
    }

    /// Write all of `data`.
    ///
    /// Partial writes are retried until the buffer is drained, then the stream
    /// is flushed.
    ///
    /// # Errors
    ///
    /// - [`TransportError::BrokenPipe`] if there is no socket or the peer closed it.
    /// - [`TransportError::Timeout`] if a previous I/O attempt on this socket timed
    ///   out, or the final flush does not complete within the read/write timeout.
    /// - [`TransportError::Write`] if the underlying write fails.
    pub async fn write(&mut self, data: &[u8]) -> TransportResult<()> {
        let mut remaining = data;

        while !remaining.is_empty() {
            if self.stream.is_none() {
                return Err(self.fail(TransportError::BrokenPipe));
            }
            if self.timed_out {
                return Err(self.fail(TransportError::Timeout));
            }

            let io_timeout = self.io_timeout;
            let stream = self.stream.as_mut().ok_or(TransportError::BrokenPipe)?;
            let attempt = match io_timeout {
                None => Some(stream.write(remaining).await),
                Some(limit) => timeout(limit, stream.write(remaining)).await.ok(),
            };

            match attempt {
                None => {
                    warn!(left = remaining.len(), "write timed out");
                    self.timed_out = true;
                }
                Some(Err(e)) => return Err(self.fail(TransportError::Write(e))),
                Some(Ok(0)) => return Err(self.fail(TransportError::BrokenPipe)),
                Some(Ok(written)) => {
                    remaining = &remaining[written..];
                    trace!(written, left = remaining.len(), "wrote chunk");
                }
            }
        }

        if data.is_empty() {
            return Ok(());
        }

        // TLS may still hold encrypted records that only a flush pushes out
        let io_timeout = self.io_timeout;
        let stream = self.stream.as_mut().ok_or(TransportError::BrokenPipe)?;
        let flushed = match io_timeout {
            None => Some(stream.flush().await),
            Some(limit) => timeout(limit, stream.flush()).await.ok(),
        };
        match flushed {
            None => {
                warn!("flush timed out");
                self.timed_out = true;
                return Err(self.fail(TransportError::Timeout));
            }
            Some(Err(e)) => return Err(self.fail(TransportError::Write(e))),
            Some(Ok(())) => {}
        }

        self.liveness.record_write(Instant::now());
        if let Some(metrics) = &self.metrics {
            metrics.record_bytes_written(data.len());
        }
        Ok(())
    }

    /// Evaluate heartbeat liveness and act on it.
    ///
    /// Does nothing unless heartbeats are enabled and both a read and a write
    /// have happened on the current connection. A peer silent for more than
    /// twice the interval triggers a reconnect; otherwise a heartbeat is sent
    /// once nothing was written for half the interval.
    ///
    /// # Errors
    ///
    /// Returns the error from the heartbeat write or the reconnect.
    pub async fn check_heartbeat(&mut self) -> TransportResult<()> {
        match self.liveness.evaluate(Instant::now()) {
            LivenessAction::Idle => Ok(()),
            LivenessAction::SendHeartbeat => self.write_heartbeat().await,
            LivenessAction::Reconnect => {
                warn!(
                    endpoint = %self.endpoint(),
                    heartbeat_secs = self.config.heartbeat,
                    "missed heartbeats from broker, reconnecting"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_reconnect();
                }
                self.reconnect().await
            }
        }
    }

    /// Send one heartbeat frame through the write path.
    ///
    /// # Errors
    ///
    /// Returns the error from [`write`](Self::write).
    pub async fn write_heartbeat(&mut self) -> TransportResult<()> {
        let frame = (self.heartbeat_frame)();
        debug!("sending heartbeat");
        self.write(&frame).await?;
        if let Some(metrics) = &self.metrics {
            metrics.record_heartbeat();
        }
        Ok(())
    }

    /// Wait until the socket is readable, `deadline` elapses, or the wait is interrupted.
    ///
    /// `None` waits indefinitely.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` without a socket, or any non-transient readiness error.
    pub async fn wait(&self, deadline: Option<Duration>) -> io::Result<WaitOutcome> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        self.waiter.wait(stream, deadline).await
    }

    fn tls_connector(&mut self) -> crate::error::TlsResult<Arc<TlsConnector>> {
        if let Some(connector) = &self.tls_connector {
            return Ok(Arc::clone(connector));
        }
        let config = self.config.tls.clone().unwrap_or_default();
        let connector = Arc::new(TlsConnector::new(&config)?);
        self.tls_connector = Some(Arc::clone(&connector));
        Ok(connector)
    }

    fn short_read(&self, received: usize, expected: usize) -> TransportError {
        self.fail(TransportError::ShortRead { received, expected })
    }

    fn fail(&self, err: TransportError) -> TransportError {
        if let Some(metrics) = &self.metrics {
            metrics.record_error(err.kind());
        }
        err
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("endpoint", &self.endpoint().to_string())
            .field("mode", &self.mode())
            .field("connected", &self.is_connected())
            .field("generation", &self.generation)
            .field("timed_out", &self.timed_out)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsConfig;
    use crate::tls::test_pki;
    use tokio::net::TcpListener;

    async fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[test]
    fn test_transport_new() {
        let transport = Transport::new(TransportConfig::new("localhost", 5672));
        assert!(!transport.is_connected());
        assert_eq!(transport.generation(), 0);
        assert_eq!(transport.endpoint().to_string(), "tcp://localhost:5672");
        assert_eq!(transport.mode(), SocketMode::Cooperative);
        assert!(transport.stream().is_none());
        assert!(transport.peer_addr().is_none());
    }

    #[test]
    fn test_tls_endpoint() {
        let config = TransportConfig::new("rabbit", 5671).with_tls(TlsConfig::default());
        let transport = Transport::new(config);
        assert_eq!(transport.endpoint().to_string(), "ssl://rabbit:5671");
    }

    #[test]
    fn test_blocking_mode() {
        let config = TransportConfig::new("localhost", 5672).with_cooperative(false);
        assert_eq!(Transport::new(config).mode(), SocketMode::Blocking);
    }

    #[test]
    fn test_close_is_idempotent_when_never_connected() {
        let mut transport = Transport::new(TransportConfig::new("localhost", 5672));
        transport.close();
        transport.close();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_write_without_socket_is_broken_pipe() {
        let mut transport = Transport::new(TransportConfig::new("localhost", 5672));
        let result = transport.write(b"AMQP").await;
        assert!(matches!(result, Err(TransportError::BrokenPipe)));
    }

    #[tokio::test]
    async fn test_read_without_socket_is_short_read() {
        let mut transport = Transport::new(TransportConfig::new("localhost", 5672));
        let result = transport.read(4).await;
        assert!(matches!(
            result,
            Err(TransportError::ShortRead {
                received: 0,
                expected: 4
            })
        ));
    }

    #[tokio::test]
    async fn test_read_zero_bytes() {
        let mut transport = Transport::new(TransportConfig::new("localhost", 5672));
        let bytes = transport.read(0).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_connect_refused_carries_os_code() {
        let (listener, port) = listener().await;
        drop(listener);

        let config = TransportConfig::new("127.0.0.1", port).with_connection_timeout(1.0);
        let mut transport = Transport::new(config);
        let err = transport.connect().await.unwrap_err();
        match err {
            TransportError::Connection { code, endpoint, .. } => {
                assert!(code.is_some());
                assert_eq!(endpoint, format!("tcp://127.0.0.1:{port}"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_connect_applies_socket_options() {
        let (_listener, port) = listener().await;
        let config = TransportConfig::new("127.0.0.1", port).with_keepalive(true);
        let mut transport = Transport::new(config);
        transport.connect().await.unwrap();

        let tcp = transport.stream().unwrap().tcp();
        assert!(SockRef::from(tcp).keepalive().unwrap());
        assert!(tcp.nodelay().unwrap());
        assert_eq!(transport.generation(), 1);
        assert_eq!(transport.peer_addr().unwrap().port(), port);
    }

    #[tokio::test]
    async fn test_blocking_mode_leaves_nagle_enabled() {
        let (_listener, port) = listener().await;
        let config = TransportConfig::new("127.0.0.1", port).with_cooperative(false);
        let mut transport = Transport::new(config);
        transport.connect().await.unwrap();

        let tcp = transport.stream().unwrap().tcp();
        assert!(!tcp.nodelay().unwrap());
        assert!(!SockRef::from(tcp).keepalive().unwrap());
    }

    #[tokio::test]
    async fn test_invalid_timeout_is_io_setup_error() {
        let (_listener, port) = listener().await;
        let config = TransportConfig::new("127.0.0.1", port).with_read_write_timeout(f64::NAN);
        let mut transport = Transport::new(config);
        let err = transport.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::IoSetup(_)));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_close_after_connect_is_idempotent() {
        let (_listener, port) = listener().await;
        let metrics = Arc::new(TransportMetrics::new());
        let mut transport = Transport::new(TransportConfig::new("127.0.0.1", port))
            .with_metrics(Arc::clone(&metrics));
        transport.connect().await.unwrap();
        assert_eq!(metrics.open_connections.get(), 1);

        transport.close();
        transport.close();
        assert!(!transport.is_connected());
        assert_eq!(metrics.open_connections.get(), 0);
    }

    #[tokio::test]
    async fn test_connect_twice_replaces_socket() {
        let (_listener, port) = listener().await;
        let mut transport = Transport::new(TransportConfig::new("127.0.0.1", port));
        transport.connect().await.unwrap();
        transport.connect().await.unwrap();
        assert_eq!(transport.generation(), 2);
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn test_custom_heartbeat_frame_producer() {
        fn marker() -> Bytes {
            Bytes::from_static(b"HB")
        }

        let (listener, port) = listener().await;
        let mut transport =
            Transport::new(TransportConfig::new("127.0.0.1", port)).with_heartbeat_frame(marker);
        transport.connect().await.unwrap();
        let (mut peer, _) = listener.accept().await.unwrap();

        transport.write_heartbeat().await.unwrap();
        let mut buf = [0u8; 2];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"HB");
        assert!(transport.last_write().is_some());
    }

    #[tokio::test]
    async fn test_tls_write_to_stalled_peer_times_out() {
        let (listener, port) = listener().await;
        let acceptor = test_pki::server_acceptor();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let tls = acceptor.accept(tcp).await.unwrap();
            // hold the session open without ever reading
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(tls);
        });

        let config = TransportConfig::new("127.0.0.1", port).with_read_write_timeout(0.3);
        let mut transport =
            Transport::new(config).with_tls_connector(test_pki::trusting_connector());
        transport.connect().await.unwrap();
        assert!(transport.stream().unwrap().is_tls());

        let payload = vec![0x5a; 64 * 1024 * 1024];
        let result = tokio::time::timeout(Duration::from_secs(20), transport.write(&payload))
            .await
            .expect("write must give up once the socket stops draining");
        assert!(matches!(result, Err(TransportError::Timeout)));
        assert!(transport.is_timed_out());
        assert!(transport.last_write().is_none());

        server.abort();
    }
}
