//! Token handlers.
//!
//! - `DELETE /api/management/v1/devauth/tokens/:id` - operator token delete
//! - `POST /api/internal/v1/devauth/tokens/verify` - token verification
//! - `DELETE /api/internal/v1/devauth/tokens?device_id=...` - revoke a device's tokens

use crate::errors::{ApiError, DevAuthError, WithRequestId};
use crate::middleware::RequestId;
use crate::models::DeviceTokensQuery;
use crate::routes::AppState;
use crate::services::token_service;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
};
use std::sync::Arc;
use tracing::instrument;

/// Extract the bearer token from the Authorization header.
///
/// A missing header, a non-Bearer scheme and an empty token are all
/// request errors, rejected before the token reaches the codec.
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, DevAuthError> {
    let auth_header = headers.get(AUTHORIZATION).ok_or_else(|| {
        tracing::debug!(target: "devauth.handler", "Missing Authorization header");
        DevAuthError::BadRequest("Missing Authorization header".to_string())
    })?;

    let token = auth_header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            tracing::debug!(target: "devauth.handler", "Invalid Authorization header format");
            DevAuthError::BadRequest("Invalid Authorization header format".to_string())
        })?;

    Ok(token)
}

/// Handler for POST /api/internal/v1/devauth/tokens/verify
///
/// # Response
///
/// - 200 OK - token is valid
/// - 400 Bad Request - Authorization header missing or not a Bearer token
/// - 401 Unauthorized - token is malformed, unknown, revoked, or its device
///   is missing or not accepted
/// - 403 Forbidden - token has expired; the device must apply for a new one
/// - 500 Internal Server Error - a store lookup failed
#[instrument(skip_all, name = "devauth.handler.verify_token")]
pub async fn verify_token(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let raw = extract_bearer_token(&headers).with_request_id(&request_id)?;

    state
        .verifier
        .verify(raw)
        .await
        .and_then(|verification| verification.into_result())
        .with_request_id(&request_id)?;

    Ok(StatusCode::OK)
}

/// Handler for DELETE /api/management/v1/devauth/tokens/:id
///
/// # Response
///
/// - 204 No Content - token deleted
/// - 404 Not Found - no such token, including one already deleted
/// - 500 Internal Server Error - the delete failed
#[instrument(skip_all, name = "devauth.handler.delete_token")]
pub async fn delete_token(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    Path(jti): Path<String>,
) -> Result<StatusCode, ApiError> {
    token_service::delete_token(state.tokens.as_ref(), &jti)
        .await
        .with_request_id(&request_id)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for DELETE /api/internal/v1/devauth/tokens?device_id=...
///
/// Revokes every token of the device. Succeeds even when the device has no
/// tokens or does not exist.
#[instrument(skip_all, name = "devauth.handler.revoke_device_tokens")]
pub async fn revoke_device_tokens(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    query: Result<Query<DeviceTokensQuery>, QueryRejection>,
) -> Result<StatusCode, ApiError> {
    let Query(query) = query.map_err(|rejection| {
        tracing::debug!(
            target: "devauth.handler",
            error = %rejection,
            "Rejected device token revocation query"
        );
        DevAuthError::BadRequest("Query must carry a single device_id parameter".to_string())
            .with_request_id(&request_id)
    })?;

    let device_id = query
        .device_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| DevAuthError::BadRequest("Missing device_id query parameter".to_string()))
        .with_request_id(&request_id)?;

    token_service::revoke_device_tokens(state.tokens.as_ref(), &device_id)
        .await
        .with_request_id(&request_id)?;

    Ok(StatusCode::NO_CONTENT)
}
