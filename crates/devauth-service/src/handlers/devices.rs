//! Device management handlers.
//!
//! - `PUT /api/management/v1/devauth/devices/:id/status`
//! - `GET /api/management/v1/devauth/devices/:id`

use crate::errors::{ApiError, DevAuthError, WithRequestId};
use crate::middleware::RequestId;
use crate::models::{DeviceResponse, DeviceStatus, UpdateStatusRequest};
use crate::observability::hash_for_correlation;
use crate::routes::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

/// Handler for PUT /api/management/v1/devauth/devices/:id/status
///
/// Body: `{"status": "pending" | "accepted" | "rejected"}`
///
/// # Response
///
/// - 204 No Content - status written (token revocation is best-effort)
/// - 400 Bad Request - body is not JSON or status is not a known value
/// - 404 Not Found - no such device
/// - 500 Internal Server Error - the status write failed
#[instrument(skip_all, name = "devauth.handler.update_device_status")]
pub async fn update_device_status(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    Path(device_id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!(
            target: "devauth.handler",
            device_hash = %hash_for_correlation(&device_id),
            error = %rejection,
            "Rejected status update body"
        );
        DevAuthError::BadRequest("Request body must be JSON of the form {\"status\": \"...\"}".to_string())
            .with_request_id(&request_id)
    })?;

    let status = DeviceStatus::from_str(&payload.status)
        .map_err(DevAuthError::BadRequest)
        .with_request_id(&request_id)?;

    state
        .admission
        .update_status(&device_id, status)
        .await
        .with_request_id(&request_id)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/management/v1/devauth/devices/:id
#[instrument(skip_all, name = "devauth.handler.get_device")]
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let device = state
        .admission
        .get_device(&device_id)
        .await
        .with_request_id(&request_id)?;

    Ok(Json(DeviceResponse::from(device)))
}
