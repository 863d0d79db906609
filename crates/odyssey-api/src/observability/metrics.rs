//! Metrics definitions for the Odyssey API.
//!
//! All metrics follow Prometheus naming conventions:
//! - `odyssey_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP methods
//! - `endpoint`: parameterised paths (`/api/stars/{id}`), unknown paths fold
//!   into `/other`
//! - `status`: success, error, timeout
//! - `policy`: read, mutate
//! - `kind`: the resource plurals
//! - `operation`: store operations

use crate::resources::ResourceKind;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return the handle used by `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // HTTP request buckets around a 200ms p95 target
        .set_buckets_for_metric(
            Matcher::Prefix("odyssey_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.300, 0.500, 1.000, 2.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Store buckets around a 50ms p99 target
        .set_buckets_for_metric(
            Matcher::Prefix("odyssey_store_operation".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set store operation buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Build a handle without installing a global recorder.
///
/// Test servers are spawned many times per process and cannot each install
/// the global recorder; their `/metrics` endpoint renders an empty registry.
pub fn detached_metrics_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `odyssey_http_requests_total`, `odyssey_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`/`status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("odyssey_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("odyssey_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout.
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize an endpoint path to bound label cardinality.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/" | "/health" | "/ready" | "/metrics" | "/upload" | "/auth/login"
        | "/auth/logout" | "/auth/register" | "/auth/me" => path.to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

/// Normalize resource and upload paths.
fn normalize_dynamic_endpoint(path: &str) -> String {
    let segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();

    match segments.as_slice() {
        ["", "api", plural] if ResourceKind::from_plural(plural).is_some() => {
            format!("/api/{plural}")
        }
        ["", "api", plural, _] if ResourceKind::from_plural(plural).is_some() => {
            format!("/api/{plural}/{{id}}")
        }
        ["", "uploads", _] => "/uploads/{file}".to_string(),
        _ => "/other".to_string(),
    }
}

// ============================================================================
// Rate Limit Metrics
// ============================================================================

/// Record a rate limit decision.
///
/// Metric: `odyssey_rate_limit_decisions_total`
/// Labels: `policy`, `decision` (allowed, rejected)
pub fn record_rate_limit_decision(policy: &str, allowed: bool) {
    let decision = if allowed { "allowed" } else { "rejected" };
    counter!("odyssey_rate_limit_decisions_total",
        "policy" => policy.to_string(),
        "decision" => decision
    )
    .increment(1);
}

// ============================================================================
// Store Metrics
// ============================================================================

/// Record one store operation.
///
/// Metric: `odyssey_store_operations_total`, `odyssey_store_operation_duration_seconds`
/// Labels: `operation`, `kind`, `status`
pub fn record_store_operation(operation: &str, kind: &str, status: &str, duration: Duration) {
    histogram!("odyssey_store_operation_duration_seconds",
        "operation" => operation.to_string(),
        "kind" => kind.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("odyssey_store_operations_total",
        "operation" => operation.to_string(),
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_util::debugging::DebuggingRecorder;

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(201), "success");
        assert_eq!(categorize_status_code(400), "error");
        assert_eq!(categorize_status_code(429), "error");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
        assert_eq!(categorize_status_code(500), "error");
    }

    #[test]
    fn test_normalize_static_endpoints() {
        assert_eq!(normalize_endpoint("/"), "/");
        assert_eq!(normalize_endpoint("/health"), "/health");
        assert_eq!(normalize_endpoint("/auth/login"), "/auth/login");
        assert_eq!(normalize_endpoint("/upload"), "/upload");
    }

    #[test]
    fn test_normalize_resource_endpoints() {
        assert_eq!(normalize_endpoint("/api/stars"), "/api/stars");
        assert_eq!(normalize_endpoint("/api/stars/"), "/api/stars");
        assert_eq!(normalize_endpoint("/api/stars/7"), "/api/stars/{id}");
        assert_eq!(normalize_endpoint("/api/nebulae/abc"), "/api/nebulae/{id}");
        assert_eq!(normalize_endpoint("/uploads/1718000000000.png"), "/uploads/{file}");
    }

    #[test]
    fn test_normalize_unknown_endpoints() {
        assert_eq!(normalize_endpoint("/api/blackholes"), "/other");
        assert_eq!(normalize_endpoint("/api/stars/7/planets"), "/other");
        assert_eq!(normalize_endpoint("/wp-admin"), "/other");
    }

    #[test]
    fn test_record_functions_emit_metrics() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_http_request("GET", "/api/stars/3", 200, Duration::from_millis(12));
            record_rate_limit_decision("mutate", false);
            record_store_operation("insert", "stars", "success", Duration::from_millis(2));
        });

        let names: Vec<String> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(key, _, _, _)| key.key().name().to_string())
            .collect();

        assert!(names.contains(&"odyssey_http_requests_total".to_string()));
        assert!(names.contains(&"odyssey_http_request_duration_seconds".to_string()));
        assert!(names.contains(&"odyssey_rate_limit_decisions_total".to_string()));
        assert!(names.contains(&"odyssey_store_operations_total".to_string()));
    }
}
