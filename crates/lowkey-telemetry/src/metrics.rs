//! Prometheus metrics registry for lowkey
//!
//! Provides the typed counters and gauges behind the daemon's `/metrics`
//! endpoint: observed events, backend errors, and detection latency.

use prometheus::{Encoder, Gauge, IntCounter, Opts, Registry, TextEncoder};

/// Central metrics registry holding all Prometheus metrics.
pub struct MetricsRegistry {
    registry: Registry,
    /// Counter: total change events observed
    pub events_total: IntCounter,
    /// Counter: total backend/scan errors
    pub errors_total: IntCounter,
    /// Gauge: latency of the most recent event, in seconds
    pub event_latency_seconds: Gauge,
    /// Counter: number of latency observations recorded
    pub event_latency_samples: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with all metrics registered.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new_custom(Some("lowkey".to_string()), None)?;

        let events_total = IntCounter::with_opts(Opts::new(
            "events_total",
            "Total change events observed",
        ))?;
        registry.register(Box::new(events_total.clone()))?;

        let errors_total = IntCounter::with_opts(Opts::new(
            "errors_total",
            "Total backend and scan errors",
        ))?;
        registry.register(Box::new(errors_total.clone()))?;

        let event_latency_seconds = Gauge::with_opts(Opts::new(
            "event_latency_seconds",
            "Latency of the most recent event in seconds",
        ))?;
        registry.register(Box::new(event_latency_seconds.clone()))?;

        let event_latency_samples = IntCounter::with_opts(Opts::new(
            "event_latency_samples",
            "Number of latency observations",
        ))?;
        registry.register(Box::new(event_latency_samples.clone()))?;

        Ok(Self {
            registry,
            events_total,
            errors_total,
            event_latency_seconds,
            event_latency_samples,
        })
    }

    // ========================================================================
    // Recording helpers
    // ========================================================================

    /// Record one observed change event.
    pub fn record_event(&self) {
        self.events_total.inc();
    }

    /// Record one backend or scan error.
    pub fn record_error(&self) {
        self.errors_total.inc();
    }

    /// Record the detection latency of an event.
    pub fn observe_latency(&self, seconds: f64) {
        self.event_latency_seconds.set(seconds);
        self.event_latency_samples.inc();
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Encode all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registry_creation() {
        let registry = MetricsRegistry::new().expect("create registry");
        let output = registry.encode().expect("encode");
        assert!(output.contains("lowkey_events_total"));
    }

    #[test]
    fn test_record_event_and_error() {
        let registry = MetricsRegistry::new().unwrap();
        registry.record_event();
        registry.record_event();
        registry.record_error();

        assert_eq!(registry.events_total.get(), 2);
        assert_eq!(registry.errors_total.get(), 1);
    }

    #[test]
    fn test_observe_latency() {
        let registry = MetricsRegistry::new().unwrap();
        registry.observe_latency(0.125);
        registry.observe_latency(0.250);

        assert_eq!(registry.event_latency_samples.get(), 2);
        assert!((registry.event_latency_seconds.get() - 0.250).abs() < f64::EPSILON);
    }

    #[test]
    fn test_encode_produces_valid_output() {
        let registry = MetricsRegistry::new().unwrap();
        registry.record_event();
        registry.observe_latency(0.5);

        let output = registry.encode().unwrap();
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
        assert!(output.contains("lowkey_event_latency_seconds"));
        assert!(output.contains("lowkey_event_latency_samples"));
    }
}
