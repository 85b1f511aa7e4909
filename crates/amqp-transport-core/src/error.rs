//! Domain error types for the AMQP transport.
//!
//! Uses `thiserror` for ergonomic error definitions with proper context.

use thiserror::Error;

/// Errors related to configuration parsing and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Host must not be empty.
    #[error("host must not be empty")]
    EmptyHost,

    /// Port must be in 1..=65535.
    #[error("port must be non-zero")]
    InvalidPort,

    /// A timeout was negative, NaN or infinite.
    #[error("invalid {name} timeout: {value} (expected a finite, non-negative number of seconds)")]
    InvalidTimeout { name: &'static str, value: f64 },

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Errors surfaced by [`Transport`](crate::transport::Transport) operations.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The socket could not be established.
    #[error("error connecting to {endpoint} ({}): {message}", display_code(.code))]
    Connection {
        endpoint: String,
        /// OS error code, when the failure came from the OS.
        code: Option<i32>,
        message: String,
    },

    /// The socket was established but a required mode or option could not be applied.
    #[error("I/O setup failed: {0}")]
    IoSetup(String),

    /// The stream ended or errored before the requested byte count arrived.
    #[error("error reading data: received {received} instead of expected {expected} bytes")]
    ShortRead { received: usize, expected: usize },

    /// No socket, or the peer closed the connection during a write.
    #[error("broken pipe or closed connection")]
    BrokenPipe,

    /// A write was attempted on a socket already flagged as timed out.
    #[error("error sending data: socket connection timed out")]
    Timeout,

    /// The underlying write call failed.
    #[error("error sending data: {0}")]
    Write(#[source] std::io::Error),
}

impl TransportError {
    /// Build a connection error from an OS-level I/O error.
    pub(crate) fn connection(endpoint: &str, err: &std::io::Error) -> Self {
        Self::Connection {
            endpoint: endpoint.to_string(),
            code: err.raw_os_error(),
            message: err.to_string(),
        }
    }

    /// Whether the error invalidates the current session.
    ///
    /// Everything except a failed connect attempt leaves the byte stream in an
    /// unknown position, so the caller must drop the session.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Connection { .. } | Self::IoSetup(_))
    }

    /// Short label used for metrics and log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::IoSetup(_) => "io_setup",
            Self::ShortRead { .. } => "short_read",
            Self::BrokenPipe => "broken_pipe",
            Self::Timeout => "timeout",
            Self::Write(_) => "write",
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "-".to_string(), |c| c.to_string())
}

/// Errors related to TLS configuration and connections.
#[derive(Error, Debug)]
pub enum TlsError {
    /// Failed to load certificate file.
    #[error("failed to load certificate from '{path}': {message}")]
    CertificateLoad { path: String, message: String },

    /// Failed to load private key file.
    #[error("failed to load private key from '{path}': {message}")]
    PrivateKeyLoad { path: String, message: String },

    /// No certificates found in file.
    #[error("no certificates found in '{0}'")]
    NoCertificates(String),

    /// No private keys found in file.
    #[error("no private keys found in '{0}'")]
    NoPrivateKeys(String),

    /// Invalid TLS configuration.
    #[error("invalid TLS configuration: {0}")]
    Config(String),

    /// TLS handshake failed.
    #[error("TLS handshake failed: {0}")]
    Handshake(String),
}

/// Result type alias for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for TLS operations.
pub type TlsResult<T> = std::result::Result<T, TlsError>;
