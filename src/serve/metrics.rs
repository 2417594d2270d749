//! Prometheus metrics for the serving API

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec_with_registry, register_histogram_vec_with_registry, CounterVec,
    Encoder, HistogramVec, Registry, TextEncoder,
};

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();
    static ref REQUEST_COUNT: CounterVec = register_counter_vec_with_registry!(
        "heart_api_requests_total",
        "Total number of requests",
        &["endpoint", "method", "http_status"],
        REGISTRY
    )
    .expect("request counter registration");
    static ref REQUEST_LATENCY: HistogramVec = register_histogram_vec_with_registry!(
        "heart_api_request_latency_seconds",
        "Request latency in seconds",
        &["endpoint", "method"],
        REGISTRY
    )
    .expect("latency histogram registration");
    static ref ERROR_COUNT: CounterVec = register_counter_vec_with_registry!(
        "heart_api_errors_total",
        "Total number of errors",
        &["endpoint", "method"],
        REGISTRY
    )
    .expect("error counter registration");
}

// /metrics scrapes would count themselves; keep them out.
const EXCLUDED_PATH_PREFIXES: [&str; 1] = ["/metrics"];

/// Record request count and latency.
pub fn record_request(endpoint: &str, method: &str, status_code: u16, elapsed_seconds: f64) {
    REQUEST_COUNT
        .with_label_values(&[endpoint, method, &status_code.to_string()])
        .inc();
    REQUEST_LATENCY
        .with_label_values(&[endpoint, method])
        .observe(elapsed_seconds);
}

/// Record an error.
pub fn record_error(endpoint: &str, method: &str) {
    ERROR_COUNT.with_label_values(&[endpoint, method]).inc();
}

/// Whether requests to this path should be tracked.
pub fn should_track_path(path: &str) -> bool {
    !EXCLUDED_PATH_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

/// Text exposition of all registered metrics.
pub fn exposition() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder.encode(&REGISTRY.gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exposition_contains_registered_metrics() {
        record_request("/predict", "POST", 200, 0.01);
        let body = exposition();
        assert!(body.contains("heart_api_requests_total"));
        assert!(body.contains("heart_api_request_latency_seconds"));
    }

    #[test]
    fn test_metrics_path_excluded() {
        assert!(!should_track_path("/metrics"));
        assert!(should_track_path("/predict"));
        assert!(should_track_path("/health"));
    }
}
