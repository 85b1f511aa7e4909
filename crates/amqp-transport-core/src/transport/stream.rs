//! Stream abstraction for broker connections.
//!
//! Provides a unified interface over plain TCP and TLS streams, plus the
//! single non-blocking read attempt the cooperative socket mode is built on.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::FutureExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

/// A stream that can be either plain TCP or TLS-encrypted.
pub enum AmqpStream {
    /// `tcp://` endpoint.
    Plain(TcpStream),
    /// `ssl://` endpoint.
    Tls(Box<TlsStream<TcpStream>>),
}

impl std::fmt::Debug for AmqpStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_tls() { "Tls" } else { "Plain" };
        f.debug_tuple(kind).field(self.tcp()).finish()
    }
}

impl AmqpStream {
    /// Create a new plain TCP stream.
    pub fn plain(stream: TcpStream) -> Self {
        Self::Plain(stream)
    }

    /// Create a new TLS stream.
    pub fn tls(stream: TlsStream<TcpStream>) -> Self {
        Self::Tls(Box::new(stream))
    }

    /// Check if this is a TLS connection.
    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// The underlying TCP socket.
    ///
    /// Use this to wait on readiness or query socket options; reading or
    /// writing through it directly would bypass TLS and desynchronise framing.
    pub fn tcp(&self) -> &TcpStream {
        match self {
            Self::Plain(stream) => stream,
            Self::Tls(stream) => stream.get_ref().0,
        }
    }

    /// Attempt one read without waiting.
    ///
    /// Returns `Ok(None)` when no data is available yet, `Ok(Some(0))` at
    /// end-of-stream, and `Ok(Some(n))` when `n` bytes were placed in `buf`.
    pub fn try_read_chunk(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        match self {
            Self::Plain(stream) => match stream.try_read(buf) {
                Ok(n) => Ok(Some(n)),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
                Err(e) => Err(e),
            },
            // rustls may hold decrypted bytes the socket no longer reports,
            // so poll the TLS layer once instead of the raw socket.
            Self::Tls(stream) => match stream.read(buf).now_or_never() {
                Some(result) => result.map(Some),
                None => Ok(None),
            },
        }
    }

    /// Wait until the underlying socket reports read readiness.
    pub async fn readable(&self) -> io::Result<()> {
        self.tcp().readable().await
    }
}

impl AsyncRead for AmqpStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            AmqpStream::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            AmqpStream::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for AmqpStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            AmqpStream::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            AmqpStream::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            AmqpStream::Plain(stream) => Pin::new(stream).poll_flush(cx),
            AmqpStream::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            AmqpStream::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            AmqpStream::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}
