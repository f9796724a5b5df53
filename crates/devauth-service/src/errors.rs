//! Device auth error types.
//!
//! Every error maps to an HTTP status code via [`ApiError`]'s `IntoResponse`
//! impl. Messages returned to clients are generic for internal failures;
//! the actual cause is logged server-side together with the request id.

use crate::middleware::request_id::RequestId;
use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Device auth error type.
///
/// Maps to HTTP status codes:
/// - Database, Crypto, Internal: 500 Internal Server Error
/// - NotFound: 404 Not Found
/// - BadRequest: 400 Bad Request
/// - InvalidToken: 401 Unauthorized
/// - TokenExpired: 403 Forbidden
#[derive(Debug, Error)]
pub enum DevAuthError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Internal server error")]
    Internal,
}

impl DevAuthError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            DevAuthError::Database(_) | DevAuthError::Crypto(_) | DevAuthError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            DevAuthError::NotFound(_) => StatusCode::NOT_FOUND,
            DevAuthError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DevAuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            DevAuthError::TokenExpired => StatusCode::FORBIDDEN,
        }
    }

    /// Whether this error represents a server-side failure.
    pub fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Attach the request-scoped correlation id.
    pub fn with_request_id(self, request_id: &RequestId) -> ApiError {
        ApiError {
            error: self,
            request_id: request_id.clone(),
        }
    }
}

/// Convert sqlx errors to DevAuthError
impl From<sqlx::Error> for DevAuthError {
    fn from(err: sqlx::Error) -> Self {
        DevAuthError::Database(err.to_string())
    }
}

/// Error returned from HTTP handlers: the failure plus the request id it
/// belongs to.
#[derive(Debug)]
pub struct ApiError {
    pub error: DevAuthError,
    pub request_id: RequestId,
}

/// Extension for handler results so that `?` can carry the request id.
pub trait WithRequestId<T> {
    fn with_request_id(self, request_id: &RequestId) -> Result<T, ApiError>;
}

impl<T> WithRequestId<T> for Result<T, DevAuthError> {
    fn with_request_id(self, request_id: &RequestId) -> Result<T, ApiError> {
        self.map_err(|e| e.with_request_id(request_id))
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
    request_id: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = self.request_id.as_str().to_string();
        let status = self.error.status_code();

        let (code, message) = match &self.error {
            DevAuthError::Database(err) => {
                tracing::error!(
                    target: "devauth.database",
                    request_id = %request_id,
                    error = %err,
                    "Database operation failed"
                );
                (
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            DevAuthError::Crypto(err) => {
                tracing::error!(
                    target: "devauth.crypto",
                    request_id = %request_id,
                    error = %err,
                    "Cryptographic operation failed"
                );
                (
                    "CRYPTO_ERROR",
                    "An internal cryptographic error occurred".to_string(),
                )
            }
            DevAuthError::NotFound(resource) => ("NOT_FOUND", resource.clone()),
            DevAuthError::BadRequest(reason) => ("BAD_REQUEST", reason.clone()),
            DevAuthError::InvalidToken(reason) => ("INVALID_TOKEN", reason.clone()),
            DevAuthError::TokenExpired => (
                "TOKEN_EXPIRED",
                "Token has expired, apply for a new one".to_string(),
            ),
            DevAuthError::Internal => {
                tracing::error!(
                    target: "devauth.internal",
                    request_id = %request_id,
                    "Internal error"
                );
                ("INTERNAL_ERROR", "An internal error occurred".to_string())
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                request_id,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"device-auth\", error=\"invalid_token\""),
            );
        }

        response
    }
}
