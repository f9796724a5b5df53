//! Metrics definitions for the device auth service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `devauth_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `outcome`: 3 values (valid, expired, invalid) plus `error`
//! - `reason`: bounded by [`crate::services::verification::InvalidReason`]
//! - `status`: device status (3 values) or query status (success, error)
//! - `trigger`: 3 values (delete, cascade, device)
//! - `path`: known routes, device and token ids replaced by `{id}`
//! - `operation` / `table`: bounded by code

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("devauth_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Verification sits on every device request path; keep the low end fine-grained
        .set_buckets_for_metric(
            Matcher::Prefix("devauth_token_verification".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500,
            ],
        )
        .map_err(|e| format!("Failed to set token verification buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("devauth_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record a token verification and its outcome.
///
/// Metric: `devauth_token_verification_duration_seconds`, `devauth_token_verifications_total`
/// Labels: `outcome`, `reason`
pub fn record_token_verification(outcome: &str, reason: Option<&str>, duration: Duration) {
    let reason = reason.unwrap_or("none");

    histogram!("devauth_token_verification_duration_seconds", "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());

    counter!("devauth_token_verifications_total",
        "outcome" => outcome.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record token revocations.
///
/// Metric: `devauth_token_revocations_total`
/// Labels: `trigger` (delete, cascade, device)
pub fn record_token_revocation(trigger: &str, count: u64) {
    counter!("devauth_token_revocations_total", "trigger" => trigger.to_string()).increment(count);
}

/// Record token issuance.
///
/// Metric: `devauth_token_issuance_total`
/// Labels: `status`
pub fn record_token_issuance(status: &str) {
    counter!("devauth_token_issuance_total", "status" => status.to_string()).increment(1);
}

/// Record expired tokens removed by the cleanup task.
///
/// Metric: `devauth_tokens_purged_total`
pub fn record_tokens_purged(count: u64) {
    counter!("devauth_tokens_purged_total").increment(count);
}

// ============================================================================
// Admission Metrics
// ============================================================================

/// Record a device status update.
///
/// Metric: `devauth_status_updates_total`
/// Labels: `status` (target status), `result` (success, not_found, error)
pub fn record_status_update(status: &str, result: &str) {
    counter!("devauth_status_updates_total",
        "status" => status.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// Record a failed cascading revocation.
///
/// Metric: `devauth_cascade_failures_total`
///
/// Tokens of the device stay stored unrevoked; verification still refuses
/// them because the device is no longer accepted.
pub fn record_cascade_failure() {
    counter!("devauth_cascade_failures_total").increment(1);
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record database query execution
///
/// Metric: `devauth_db_query_duration_seconds`, `devauth_db_queries_total`
/// Labels: `operation`, `table`, `status`
pub fn record_db_query(operation: &str, table: &str, status: &str, duration: Duration) {
    histogram!("devauth_db_query_duration_seconds", "operation" => operation.to_string(), "table" => table.to_string())
        .record(duration.as_secs_f64());

    counter!("devauth_db_queries_total", "operation" => operation.to_string(), "table" => table.to_string(), "status" => status.to_string())
        .increment(1);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `devauth_http_requests_total`, `devauth_http_request_duration_seconds`
/// Labels: `method`, `path`, `status_code`
///
/// This captures ALL HTTP responses including framework-level errors like:
/// - 415 Unsupported Media Type (wrong Content-Type)
/// - 404 Not Found
/// - 405 Method Not Allowed
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let normalized_path = normalize_path(path);

    histogram!("devauth_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => normalized_path.clone(),
        "status_code" => status_code.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("devauth_http_requests_total",
        "method" => method.to_string(),
        "path" => normalized_path,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

const MANAGEMENT_DEVICES_PREFIX: &str = "/api/management/v1/devauth/devices/";
const MANAGEMENT_TOKENS_PREFIX: &str = "/api/management/v1/devauth/tokens/";

/// Normalize path to prevent label cardinality explosion
///
/// Device ids and token ids are opaque strings, so any single segment in an
/// id position is replaced with `{id}`.
fn normalize_path(path: &str) -> String {
    match path {
        "/health"
        | "/ready"
        | "/metrics"
        | "/api/internal/v1/devauth/tokens"
        | "/api/internal/v1/devauth/tokens/verify" => path.to_string(),
        _ => normalize_dynamic_path(path),
    }
}

/// Examples:
/// - `/api/management/v1/devauth/devices/dev-1` → `/api/management/v1/devauth/devices/{id}`
/// - `/api/management/v1/devauth/devices/dev-1/status` → `/api/management/v1/devauth/devices/{id}/status`
/// - `/api/management/v1/devauth/tokens/jti-1` → `/api/management/v1/devauth/tokens/{id}`
fn normalize_dynamic_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix(MANAGEMENT_DEVICES_PREFIX) {
        let segments: Vec<&str> = rest.split('/').collect();
        match segments.as_slice() {
            [id] if !id.is_empty() => return "/api/management/v1/devauth/devices/{id}".to_string(),
            [id, "status"] if !id.is_empty() => {
                return "/api/management/v1/devauth/devices/{id}/status".to_string()
            }
            _ => {}
        }
    }

    if let Some(rest) = path.strip_prefix(MANAGEMENT_TOKENS_PREFIX) {
        if !rest.is_empty() && !rest.contains('/') {
            return "/api/management/v1/devauth/tokens/{id}".to_string();
        }
    }

    // For unknown paths, use a generic label to bound cardinality
    "/other".to_string()
}
