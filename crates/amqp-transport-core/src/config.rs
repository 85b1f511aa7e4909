//! Configuration types for the AMQP transport.
//!
//! Configuration is loaded from YAML files and validated before use. Everything
//! here is fixed at construction time; a [`Transport`](crate::transport::Transport)
//! never mutates its configuration, so `reconnect` always reuses it verbatim.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Default AMQP port.
pub const DEFAULT_PORT: u16 = 5672;

/// Root configuration file layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AmqpClientConfig {
    /// Socket-level transport settings.
    pub transport: TransportConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    /// Broker host name or address.
    /// Supports environment variable expansion: "${AMQP_HOST}"
    pub host: String,

    /// Broker port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Connect timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: f64,

    /// Timeout in seconds applied to each individual read or write attempt.
    /// Fractional values are honoured down to the microsecond.
    #[serde(default = "default_read_write_timeout")]
    pub read_write_timeout: f64,

    /// TLS settings. When present the endpoint becomes `ssl://host:port`.
    #[serde(default)]
    pub tls: Option<TlsConfig>,

    /// Enable OS-level TCP keepalive on the socket.
    #[serde(default)]
    pub keepalive: bool,

    /// Heartbeat interval in seconds. 0 disables heartbeats.
    #[serde(default)]
    pub heartbeat: u16,

    /// Use the cooperative (non-blocking + readiness wait) socket mode.
    ///
    /// When disabled, every read awaits data directly, bounded only by
    /// `read_write_timeout`.
    #[serde(default = "default_cooperative")]
    pub cooperative: bool,
}

/// TLS configuration for broker connections.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to CA certificate file (PEM format) for verifying the broker certificate.
    /// If not set, uses the bundled web PKI roots.
    pub ca_cert_path: Option<PathBuf>,

    /// Path to client certificate file (PEM format) for mTLS authentication.
    pub cert_path: Option<PathBuf>,

    /// Path to client private key file (PEM format) for mTLS authentication.
    pub key_path: Option<PathBuf>,

    /// Name used for SNI and certificate verification. Defaults to the host.
    pub server_name: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output logs in JSON format (for production).
    #[serde(default)]
    pub json: bool,
}

// Default value functions

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connection_timeout() -> f64 {
    3.0
}

fn default_read_write_timeout() -> f64 {
    3.0
}

fn default_cooperative() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Split fractional seconds into whole seconds and microseconds.
///
/// `1.5` becomes `(1, 500_000)`. Negative and non-finite input yields `None`.
#[must_use]
pub fn split_seconds_microseconds(seconds: f64) -> Option<(u64, u32)> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let whole = seconds.floor();
    let mut sec = whole as u64;
    let mut usec = ((seconds - whole) * 1_000_000.0).round() as u32;
    if usec >= 1_000_000 {
        sec += 1;
        usec -= 1_000_000;
    }
    Some((sec, usec))
}

/// Convert fractional seconds into a `Duration` via the seconds/microseconds split.
fn seconds_to_duration(name: &'static str, seconds: f64) -> ConfigResult<Duration> {
    let (sec, usec) = split_seconds_microseconds(seconds)
        .ok_or(ConfigError::InvalidTimeout { name, value: seconds })?;
    Ok(Duration::from_secs(sec) + Duration::from_micros(u64::from(usec)))
}

/// Expand environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of the environment variable `VAR_NAME`.
/// If the variable is not set, replaces with an empty string.
fn expand_env_vars(s: &str) -> String {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex");
    re.replace_all(s, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_default()
    })
    .to_string()
}

impl TransportConfig {
    /// Create a configuration for `host:port` with every other setting at its default.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connection_timeout: default_connection_timeout(),
            read_write_timeout: default_read_write_timeout(),
            tls: None,
            keepalive: false,
            heartbeat: 0,
            cooperative: default_cooperative(),
        }
    }

    /// Set the heartbeat interval in seconds.
    #[must_use]
    pub fn with_heartbeat(mut self, seconds: u16) -> Self {
        self.heartbeat = seconds;
        self
    }

    /// Set the per-operation read/write timeout in seconds.
    #[must_use]
    pub fn with_read_write_timeout(mut self, seconds: f64) -> Self {
        self.read_write_timeout = seconds;
        self
    }

    /// Set the connect timeout in seconds.
    #[must_use]
    pub fn with_connection_timeout(mut self, seconds: f64) -> Self {
        self.connection_timeout = seconds;
        self
    }

    /// Enable or disable TCP keepalive.
    #[must_use]
    pub fn with_keepalive(mut self, keepalive: bool) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Select cooperative or blocking socket mode.
    #[must_use]
    pub fn with_cooperative(mut self, cooperative: bool) -> Self {
        self.cooperative = cooperative;
        self
    }

    /// Attach TLS settings.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Get the host with environment variables expanded.
    #[must_use]
    pub fn host(&self) -> String {
        expand_env_vars(&self.host)
    }

    /// Connect timeout as a `Duration`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured value is negative or not finite.
    pub fn connection_timeout_duration(&self) -> ConfigResult<Duration> {
        seconds_to_duration("connection", self.connection_timeout)
    }

    /// Read/write timeout as a `Duration`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured value is negative or not finite.
    pub fn read_write_timeout_duration(&self) -> ConfigResult<Duration> {
        seconds_to_duration("read_write", self.read_write_timeout)
    }

    /// Heartbeat interval, or `None` when heartbeats are disabled.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat > 0).then(|| Duration::from_secs(u64::from(self.heartbeat)))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the host is empty after environment expansion
    /// - the port is zero
    /// - either timeout is negative or not finite
    pub fn validate(&self) -> ConfigResult<()> {
        if self.host().trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        self.connection_timeout_duration()?;
        self.read_write_timeout_duration()?;
        Ok(())
    }
}

// Configuration loading and validation

impl AmqpClientConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if
    /// validation fails.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&content)
    }

    /// Load configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation check fails.
    pub fn validate(&self) -> ConfigResult<()> {
        self.transport.validate()
    }
}
