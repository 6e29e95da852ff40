//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::sync::LazyLock;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use regex::Regex;

use super::config::MetricsConfig;

static UUID_SEGMENT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-?[0-9a-f]{4}-?[0-9a-f]{4}-?[0-9a-f]{4}-?[0-9a-f]{12}").ok()
});

static NUMERIC_SEGMENT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"/\d+(/|$)").ok());

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
    path: String,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("mcp_gateway_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
                path: config.path.clone(),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics) -> Router {
    let path = metrics.path.clone();
    Router::new()
        .route(&path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Record an admit/deny decision
pub fn record_rate_limit_decision(tier: &str, allowed: bool) {
    let outcome = if allowed { "allowed" } else { "denied" };
    counter!(
        "gateway_rate_limit_decisions_total",
        "tier" => tier.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a proxied upstream call; `status` is `None` on transport failure
pub fn record_upstream_request(mode: &str, status: Option<u16>, duration: Duration) {
    let status = status.map_or_else(|| "error".to_string(), |s| s.to_string());
    let labels = [("mode", mode.to_string()), ("status", status)];

    counter!("gateway_upstream_requests_total", &labels).increment(1);
    histogram!("gateway_upstream_request_duration_seconds", &labels)
        .record(duration.as_secs_f64());
}

/// Record a newly issued identity
pub fn record_identity_issued(tier: &str) {
    counter!("gateway_identities_issued_total", "tier" => tier.to_string()).increment(1);
}

/// Sanitize URL path for metric labels (remove IDs, limit cardinality)
fn sanitize_path(path: &str) -> String {
    let mut path = path.to_string();

    if let Some(re) = UUID_SEGMENT.as_ref() {
        path = re.replace_all(&path, "{id}").into_owned();
    }
    if let Some(re) = NUMERIC_SEGMENT.as_ref() {
        path = re.replace_all(&path, "/{id}$1").into_owned();
    }

    path.chars().take(50).collect()
}
