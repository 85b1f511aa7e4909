//! AMQP 0-9-1 Client Transport
//!
//! This library provides the socket layer underneath an AMQP 0-9-1 client:
//! connecting to a broker over plain TCP or TLS, reading exact byte counts,
//! writing complete buffers, and keeping the connection alive with heartbeat
//! frames. Framing above the 7-byte frame header is left to the caller.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Domain-specific error types
//! - [`transport`] - Socket lifecycle, exact reads, full writes
//! - [`liveness`] - Heartbeat liveness decisions
//! - [`wait`] - Interruptible readiness waits
//! - [`frame`] - Protocol header and heartbeat frame constants
//! - [`metrics`] - Prometheus metrics collection
//! - [`tls`] - TLS client support for `ssl://` endpoints
//! - [`logging`] - Tracing subscriber setup
//!
//! # Example
//!
//! ```rust,ignore
//! use amqp_transport_core::config::TransportConfig;
//! use amqp_transport_core::frame::PROTOCOL_HEADER;
//! use amqp_transport_core::Transport;
//!
//! let config = TransportConfig::new("localhost", 5672).with_heartbeat(60);
//! let mut transport = Transport::open(config).await?;
//!
//! transport.write(PROTOCOL_HEADER).await?;
//! let header = transport.read(7).await?;
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod frame;
pub mod liveness;
pub mod logging;
pub mod metrics;
pub mod tls;
pub mod transport;
pub mod wait;

/// Test utilities for integration testing.
///
/// This module is only available when compiling tests or when the `testing` feature is enabled.
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use config::{AmqpClientConfig, LoggingConfig, TlsConfig, TransportConfig};
pub use error::{ConfigError, TlsError, TransportError, TransportResult};
pub use metrics::TransportMetrics;
pub use tls::TlsConnector;
pub use transport::{AmqpStream, Endpoint, Scheme, SocketMode, Transport};
pub use wait::{WaitInterrupt, WaitOutcome};
