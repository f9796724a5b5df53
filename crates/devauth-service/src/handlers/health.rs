//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - pings the device registry and token store

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Does NOT check any dependencies; failure means the process is hung.
pub async fn health_check() -> &'static str {
    "OK"
}

fn health_label(healthy: bool) -> String {
    if healthy { "healthy" } else { "unhealthy" }.to_string()
}

/// Readiness probe handler.
///
/// Returns 200 if both stores answer, 503 otherwise. The error message is
/// generic; the actual store errors are logged server-side.
#[tracing::instrument(skip_all, name = "devauth.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (registry_check, token_check) = tokio::join!(state.devices.ping(), state.tokens.ping());

    if let Err(e) = &registry_check {
        tracing::warn!(target: "devauth.health", error = %e, "Readiness check failed: device registry");
    }
    if let Err(e) = &token_check {
        tracing::warn!(target: "devauth.health", error = %e, "Readiness check failed: token store");
    }

    let ready = registry_check.is_ok() && token_check.is_ok();
    let response = ReadinessResponse {
        status: if ready { "ready" } else { "not_ready" }.to_string(),
        device_registry: health_label(registry_check.is_ok()),
        token_store: health_label(token_check.is_ok()),
        error: (!ready).then(|| "Service dependencies unavailable".to_string()),
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
