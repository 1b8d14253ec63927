// ============================================================================
// ERP Metrics
// ============================================================================
//
// Prometheus metrics for outbound vendor traffic and sync passes.
//
// 1. erp_requests_total{provider, method, status}
// 2. erp_request_duration_seconds{provider, method}
// 3. erp_sync_items_total{provider, entity}
// 4. erp_sync_failures_total{provider, entity}
//
// Everything is registered in the prometheus default registry; the embedding
// application exposes it with `gather_text()`.
//
// ============================================================================

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::time::Duration;

lazy_static! {
    /// Vendor requests by provider, HTTP method and status ("error" for transport failures)
    pub static ref ERP_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "erp_requests_total",
        "Total number of requests sent to ERP backends",
        &["provider", "method", "status"]
    ).unwrap();

    pub static ref ERP_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "erp_request_duration_seconds",
        "ERP backend request latency in seconds",
        &["provider", "method"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    ).unwrap();

    /// Entities fetched by sync passes
    pub static ref ERP_SYNC_ITEMS_TOTAL: CounterVec = register_counter_vec!(
        "erp_sync_items_total",
        "Total number of entities fetched by ERP sync passes",
        &["provider", "entity"]
    ).unwrap();

    pub static ref ERP_SYNC_FAILURES_TOTAL: CounterVec = register_counter_vec!(
        "erp_sync_failures_total",
        "Total number of failed ERP sync passes",
        &["provider", "entity"]
    ).unwrap();
}

pub fn record_request(provider: &str, method: &str, status: Option<u16>, elapsed: Duration) {
    let status = status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "error".to_string());

    ERP_REQUESTS_TOTAL
        .with_label_values(&[provider, method, &status])
        .inc();
    ERP_REQUEST_DURATION
        .with_label_values(&[provider, method])
        .observe(elapsed.as_secs_f64());
}

pub fn record_sync(provider: &str, entity: &str, items: usize) {
    ERP_SYNC_ITEMS_TOTAL
        .with_label_values(&[provider, entity])
        .inc_by(items as f64);
}

pub fn record_sync_failure(provider: &str, entity: &str) {
    ERP_SYNC_FAILURES_TOTAL
        .with_label_values(&[provider, entity])
        .inc();
}

/// Render every registered metric in the Prometheus text format.
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}
