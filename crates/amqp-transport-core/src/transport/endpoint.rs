//! Broker endpoint addressing.

use std::fmt;

/// Transport scheme of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Plain TCP.
    Tcp,
    /// TLS over TCP.
    Ssl,
}

impl Scheme {
    /// URI scheme name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Ssl => "ssl",
        }
    }
}

/// A resolved `scheme://host:port` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    #[must_use]
    pub fn new(scheme: Scheme, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
        }
    }

    /// Whether a TLS handshake is required.
    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.scheme == Scheme::Ssl
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme.as_str(), self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            Endpoint::new(Scheme::Tcp, "localhost", 5672).to_string(),
            "tcp://localhost:5672"
        );
        assert_eq!(
            Endpoint::new(Scheme::Ssl, "rabbit.example.com", 5671).to_string(),
            "ssl://rabbit.example.com:5671"
        );
    }

    #[test]
    fn test_is_tls() {
        assert!(!Endpoint::new(Scheme::Tcp, "h", 1).is_tls());
        assert!(Endpoint::new(Scheme::Ssl, "h", 1).is_tls());
    }
}
