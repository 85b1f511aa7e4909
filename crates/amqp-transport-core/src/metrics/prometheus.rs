//! Prometheus metrics for the AMQP transport.

use prometheus::{Counter, CounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Transport metrics collection.
///
/// One collection may be shared (behind an `Arc`) by several transports.
pub struct TransportMetrics {
    /// The Prometheus registry.
    pub registry: Registry,

    /// Total payload bytes read from the broker.
    pub bytes_read: Counter,

    /// Total payload bytes written to the broker.
    pub bytes_written: Counter,

    /// Heartbeat frames sent.
    pub heartbeats_sent: Counter,

    /// Reconnects triggered by missed heartbeats.
    pub reconnects: Counter,

    /// Successful connects.
    pub connects: Counter,

    /// Failed operations by error kind.
    pub errors: CounterVec,

    /// Currently open sockets.
    pub open_connections: IntGauge,
}

impl TransportMetrics {
    /// Create a new metrics collection.
    ///
    /// # Panics
    ///
    /// Panics if metric registration fails (should not happen with unique names).
    #[must_use]
    pub fn new() -> Self {
        let registry = Registry::new();

        let bytes_read = Counter::new(
            "amqp_transport_bytes_read_total",
            "Total bytes read from the broker",
        )
        .expect("metric creation should succeed");

        let bytes_written = Counter::new(
            "amqp_transport_bytes_written_total",
            "Total bytes written to the broker",
        )
        .expect("metric creation should succeed");

        let heartbeats_sent = Counter::new(
            "amqp_transport_heartbeats_sent_total",
            "Total number of heartbeat frames sent",
        )
        .expect("metric creation should succeed");

        let reconnects = Counter::new(
            "amqp_transport_reconnects_total",
            "Total number of reconnects after missed heartbeats",
        )
        .expect("metric creation should succeed");

        let connects = Counter::new(
            "amqp_transport_connects_total",
            "Total number of successful connects",
        )
        .expect("metric creation should succeed");

        let errors = CounterVec::new(
            Opts::new(
                "amqp_transport_errors_total",
                "Total number of transport errors by kind",
            ),
            &["kind"],
        )
        .expect("metric creation should succeed");

        let open_connections = IntGauge::new(
            "amqp_transport_open_connections",
            "Current number of open broker sockets",
        )
        .expect("metric creation should succeed");

        for collector in [
            Box::new(bytes_read.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(bytes_written.clone()),
            Box::new(heartbeats_sent.clone()),
            Box::new(reconnects.clone()),
            Box::new(connects.clone()),
            Box::new(errors.clone()),
            Box::new(open_connections.clone()),
        ] {
            registry
                .register(collector)
                .expect("metric registration should succeed");
        }

        Self {
            registry,
            bytes_read,
            bytes_written,
            heartbeats_sent,
            reconnects,
            connects,
            errors,
            open_connections,
        }
    }

    /// Record bytes read.
    pub fn record_bytes_read(&self, bytes: usize) {
        self.bytes_read.inc_by(bytes as f64);
    }

    /// Record bytes written.
    pub fn record_bytes_written(&self, bytes: usize) {
        self.bytes_written.inc_by(bytes as f64);
    }

    /// Record a heartbeat frame sent.
    pub fn record_heartbeat(&self) {
        self.heartbeats_sent.inc();
    }

    /// Record a liveness-triggered reconnect.
    pub fn record_reconnect(&self) {
        self.reconnects.inc();
    }

    /// Record a socket being opened.
    pub fn record_connect(&self) {
        self.connects.inc();
        self.open_connections.inc();
    }

    /// Record a socket being closed.
    pub fn record_close(&self) {
        self.open_connections.dec();
    }

    /// Record a failed operation.
    pub fn record_error(&self, kind: &str) {
        self.errors.with_label_values(&[kind]).inc();
    }

    /// Encode metrics in Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = String::new();
        encoder.encode_utf8(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

impl Default for TransportMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransportMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportMetrics").finish_non_exhaustive()
    }
}
