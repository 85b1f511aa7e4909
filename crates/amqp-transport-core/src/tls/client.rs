//! TLS connector for `ssl://` broker endpoints.
//!
//! The transport treats TLS as an opaque capability: it either builds a
//! connector from a [`TlsConfig`] or accepts a fully formed rustls
//! `ClientConfig` from the caller, and never applies certificate policy of
//! its own.

use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::crypto::ring::default_provider;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::{ClientConfig, RootCertStore};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector as TokioTlsConnector;
use tracing::{debug, warn};

use crate::config::TlsConfig;
use crate::error::{TlsError, TlsResult};

/// Install the ring crypto provider if not already installed.
fn ensure_crypto_provider() {
    // already-installed is fine
    let _ = CryptoProvider::install_default(default_provider());
}

/// Wraps TCP connections to the broker in TLS.
#[derive(Clone)]
pub struct TlsConnector {
    inner: TokioTlsConnector,
    server_name: Option<String>,
}

impl std::fmt::Debug for TlsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConnector")
            .field("server_name", &self.server_name)
            .finish_non_exhaustive()
    }
}

impl TlsConnector {
    /// Create a connector from file-based configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Certificate files cannot be loaded
    /// - Private key files cannot be loaded
    /// - TLS configuration is invalid
    pub fn new(config: &TlsConfig) -> TlsResult<Self> {
        ensure_crypto_provider();
        let client_config = build_client_config(config)?;
        Ok(Self {
            inner: TokioTlsConnector::from(Arc::new(client_config)),
            server_name: config.server_name.clone(),
        })
    }

    /// Wrap an externally constructed rustls configuration as-is.
    #[must_use]
    pub fn from_client_config(config: Arc<ClientConfig>) -> Self {
        Self {
            inner: TokioTlsConnector::from(config),
            server_name: None,
        }
    }

    /// Create a connector trusting the bundled web PKI roots.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS configuration cannot be built.
    pub fn with_webpki_roots() -> TlsResult<Self> {
        Self::new(&TlsConfig::default())
    }

    /// Override the name used for SNI and certificate verification.
    #[must_use]
    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = Some(server_name.into());
        self
    }

    /// The SNI name to present for `host`.
    #[must_use]
    pub fn server_name_for<'a>(&'a self, host: &'a str) -> &'a str {
        self.server_name.as_deref().unwrap_or(host)
    }

    /// Perform the TLS handshake over an established TCP stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the server name is invalid or the handshake fails.
    pub async fn connect(&self, host: &str, stream: TcpStream) -> TlsResult<TlsStream<TcpStream>> {
        let name = self.server_name_for(host).to_string();
        let server_name = ServerName::try_from(name)
            .map_err(|e| TlsError::Config(format!("invalid server name: {e}")))?;

        debug!(?server_name, "initiating TLS handshake");

        self.inner
            .connect(server_name, stream)
            .await
            .map_err(|e| TlsError::Handshake(e.to_string()))
    }
}

fn build_client_config(config: &TlsConfig) -> TlsResult<ClientConfig> {
    let builder = ClientConfig::builder().with_root_certificates(build_root_store(config)?);

    match (&config.cert_path, &config.key_path) {
        (Some(cert_path), Some(key_path)) => {
            debug!("loading client certificate for mTLS");
            let certs = load_certificates(cert_path)?;
            let key = load_private_key(key_path)?;
            builder
                .with_client_auth_cert(certs, key)
                .map_err(|e| TlsError::Config(format!("failed to configure client auth: {e}")))
        }
        (None, None) => Ok(builder.with_no_client_auth()),
        _ => Err(TlsError::Config(
            "cert_path and key_path must be set together".to_string(),
        )),
    }
}

fn build_root_store(config: &TlsConfig) -> TlsResult<RootCertStore> {
    let mut root_store = RootCertStore::empty();

    let Some(ca_path) = &config.ca_cert_path else {
        debug!("using web PKI root certificates");
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        return Ok(root_store);
    };

    debug!(path = %ca_path.display(), "loading custom CA certificate");
    let (added, ignored) = root_store.add_parsable_certificates(load_certificates(ca_path)?);
    debug!(added, ignored, "added CA certificates to trust store");

    if added == 0 {
        return Err(TlsError::NoCertificates(ca_path.display().to_string()));
    }
    Ok(root_store)
}

/// Load certificates from a PEM file.
fn load_certificates(path: &Path) -> TlsResult<Vec<CertificateDer<'static>>> {
    let file = std::fs::File::open(path).map_err(|e| TlsError::CertificateLoad {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut BufReader::new(file))
        .filter_map(|result| {
            result
                .map_err(|e| warn!(error = %e, "skipping invalid certificate"))
                .ok()
        })
        .collect();

    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.display().to_string()));
    }

    debug!(count = certs.len(), path = %path.display(), "loaded certificates");
    Ok(certs)
}

/// Load the first private key (PKCS#1, PKCS#8 or SEC1) from a PEM file.
fn load_private_key(path: &Path) -> TlsResult<PrivateKeyDer<'static>> {
    let key_error = |message: String| TlsError::PrivateKeyLoad {
        path: path.display().to_string(),
        message,
    };

    let file = std::fs::File::open(path).map_err(|e| key_error(e.to_string()))?;

    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|e| key_error(e.to_string()))?
        .ok_or_else(|| TlsError::NoPrivateKeys(path.display().to_string()))
}
