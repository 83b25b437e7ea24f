//! Lowkey Telemetry - Prometheus metrics and the `/metrics` endpoint
//!
//! Optional: the daemon only binds the HTTP server when a metrics address
//! is configured through the environment.

pub mod metrics;
pub mod server;

pub use metrics::MetricsRegistry;
pub use server::MetricsServer;
