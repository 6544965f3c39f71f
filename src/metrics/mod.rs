// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics,
    API_CALLS,
    API_DURATION,
    QUERY_ERRORS,
    CACHE_OPERATIONS,
    CACHE_ENTRIES,
};

/// Helper to record an upstream API call. `status` is `0` when no HTTP
/// response arrived at all.
pub fn record_api_call(endpoint: &str, status: u16, duration_secs: f64) {
    let status = if status == 0 {
        "transport_error".to_string()
    } else {
        status.to_string()
    };
    API_CALLS.with_label_values(&[endpoint, &status]).inc();
    API_DURATION.with_label_values(&[endpoint]).observe(duration_secs);
}

pub fn record_query_error(kind: &str) {
    QUERY_ERRORS.with_label_values(&[kind]).inc();
}

/// Helpers to record response cache operations
pub fn record_cache_hit() {
    CACHE_OPERATIONS.with_label_values(&["hit"]).inc();
}

pub fn record_cache_miss() {
    CACHE_OPERATIONS.with_label_values(&["miss"]).inc();
}

pub fn record_cache_insert() {
    CACHE_OPERATIONS.with_label_values(&["insert"]).inc();
}

pub fn record_cache_evictions(count: usize) {
    if count > 0 {
        CACHE_OPERATIONS.with_label_values(&["evict"]).inc_by(count as f64);
    }
}

pub fn update_cache_entries(count: usize) {
    CACHE_ENTRIES.with_label_values(&["stored"]).set(count as f64);
}
