//! Observability for the ensemble engine
//!
//! Metrics are collected in-process and rendered on demand in the Prometheus text
//! format. Nothing here opens a socket.

pub mod metrics;

pub use metrics::EnsembleMetrics;
