//! TLS support for `ssl://` broker connections.
//!
//! ```rust,ignore
//! use amqp_transport_core::tls::TlsConnector;
//! use amqp_transport_core::config::TlsConfig;
//!
//! let connector = TlsConnector::new(&TlsConfig::default())?;
//! let transport = Transport::new(config).with_tls_connector(connector);
//! ```

pub mod client;

#[cfg(test)]
pub(crate) mod test_pki;

pub use client::TlsConnector;
