//! Span export and metrics settings

use serde::Deserialize;

/// `[observability]` section; every field may be omitted
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub tracing: TracingConfig,
    pub metrics: MetricsConfig,
}

/// OpenTelemetry span export over OTLP/gRPC, off unless `enabled`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
    pub otlp_endpoint: String,
    /// Reported as the `service.name` resource attribute
    pub service_name: String,
    pub sampling_ratio: f64,
}

impl TracingConfig {
    /// Sampling ratio clamped to `[0, 1]`; a NaN ratio samples nothing
    pub fn effective_sampling_ratio(&self) -> f64 {
        if self.sampling_ratio.is_nan() {
            0.0
        } else {
            self.sampling_ratio.clamp(0.0, 1.0)
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            service_name: "mcp-gateway".to_string(),
            sampling_ratio: 1.0,
        }
    }
}

/// Prometheus scrape endpoint, served next to the gateway routes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}
