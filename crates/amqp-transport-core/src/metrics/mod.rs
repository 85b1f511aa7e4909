//! Metrics collection for the AMQP transport.
//!
//! Provides Prometheus-compatible counters for traffic, heartbeats and
//! reconnects, plus a gauge tracking whether the socket is currently open.

pub mod prometheus;

pub use prometheus::TransportMetrics;
