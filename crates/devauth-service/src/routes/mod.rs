//! HTTP routes for the device auth service.
//!
//! Defines the Axum router and application state.

use crate::crypto::TokenCodec;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, request_id_middleware};
use crate::repositories::{DeviceRegistry, TokenStore};
use crate::services::{AdmissionController, TokenIssuer, VerificationEngine};
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Device admission status store.
    pub devices: Arc<dyn DeviceRegistry>,

    /// Token record store.
    pub tokens: Arc<dyn TokenStore>,

    /// Status transitions with cascading revocation.
    pub admission: AdmissionController,

    /// Token verification over codec and stores.
    pub verifier: VerificationEngine,

    /// Token issuance with the configured lifetime.
    pub issuer: TokenIssuer,
}

impl AppState {
    /// Wire the services over one codec and one pair of stores.
    pub fn new(
        codec: Arc<TokenCodec>,
        devices: Arc<dyn DeviceRegistry>,
        tokens: Arc<dyn TokenStore>,
        token_ttl: chrono::Duration,
    ) -> Self {
        Self {
            admission: AdmissionController::new(devices.clone(), tokens.clone()),
            issuer: TokenIssuer::new(codec.clone(), tokens.clone(), token_ttl),
            verifier: VerificationEngine::new(codec, tokens.clone(), devices.clone()),
            devices,
            tokens,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK") - unversioned
/// - `/ready` - Readiness probe (pings both stores) - unversioned
/// - `/metrics` - Prometheus metrics endpoint - unversioned
/// - `/api/management/v1/devauth/...` - Operator API (device status, token delete)
/// - `/api/internal/v1/devauth/...` - Service API (token verify, device token revocation)
/// - Request id, trace, timeout and HTTP metrics layers
///
/// Caller authorization for the management and internal APIs is enforced
/// in front of this service.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let management_routes = Router::new()
        .route(
            "/api/management/v1/devauth/devices/:id/status",
            put(handlers::update_device_status),
        )
        .route(
            "/api/management/v1/devauth/devices/:id",
            get(handlers::get_device),
        )
        .route(
            "/api/management/v1/devauth/tokens/:id",
            delete(handlers::delete_token),
        )
        .with_state(state.clone());

    let internal_routes = Router::new()
        .route(
            "/api/internal/v1/devauth/tokens/verify",
            post(handlers::verify_token),
        )
        .route(
            "/api/internal/v1/devauth/tokens",
            delete(handlers::revoke_device_tokens),
        )
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. request_id_middleware - Assign and echo X-Request-Id
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    health_routes
        .merge(metrics_routes)
        .merge(management_routes)
        .merge(internal_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(http_metrics_middleware))
}
