//! Prometheus metrics via `metrics` + `metrics-exporter-prometheus`.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

/// The process-wide recorder may only be installed once; `AppState::new`
/// can run more than once within a test binary, so the handle is built
/// lazily and shared rather than re-installed per call.
static HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
});

pub fn init_metrics() -> PrometheusHandle {
    HANDLE.clone()
}

pub fn record_request(route: &'static str, status: u16) {
    metrics::counter!("legal_rag_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
}

pub fn record_query_latency(route: &'static str, millis: f64) {
    metrics::histogram!("legal_rag_query_latency_ms", "route" => route).record(millis);
}
