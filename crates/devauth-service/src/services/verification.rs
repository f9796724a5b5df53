//! Token verification engine.
//!
//! A token is valid iff it decodes, its record exists and is not revoked,
//! its expiry lies in the future, and its device resolves with status
//! `accepted`. Every condition is re-checked against the stores on every
//! call; nothing is cached.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. decode (no store access on failure)
//! 2. token record: unknown, revoked, or bound to another device
//! 3. expiry
//! 4. device: unknown or not accepted

use crate::crypto::{TokenClaims, TokenCodec};
use crate::errors::DevAuthError;
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_token_verification;
use crate::repositories::{DeviceRegistry, TokenStore};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Why a token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// Signature, structure, algorithm or issuer check failed.
    Malformed,
    /// No record for the token id (never issued, or deleted).
    UnknownToken,
    /// Record revoked.
    Revoked,
    /// Record belongs to a different device than the token's subject.
    DeviceMismatch,
    /// The token's device does not exist.
    DeviceNotFound,
    /// The token's device is pending or rejected.
    DeviceNotAccepted,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::Malformed => "malformed",
            InvalidReason::UnknownToken => "unknown_token",
            InvalidReason::Revoked => "revoked",
            InvalidReason::DeviceMismatch => "device_mismatch",
            InvalidReason::DeviceNotFound => "device_not_found",
            InvalidReason::DeviceNotAccepted => "device_not_accepted",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of verifying a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid(TokenClaims),
    Expired,
    Invalid(InvalidReason),
}

impl Verification {
    /// Metrics label.
    pub fn outcome(&self) -> &'static str {
        match self {
            Verification::Valid(_) => "valid",
            Verification::Expired => "expired",
            Verification::Invalid(_) => "invalid",
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid(_))
    }

    /// Map the outcome onto the HTTP error model: valid tokens pass,
    /// expired and invalid tokens become their client error kinds.
    pub fn into_result(self) -> Result<TokenClaims, DevAuthError> {
        match self {
            Verification::Valid(claims) => Ok(claims),
            Verification::Expired => Err(DevAuthError::TokenExpired),
            Verification::Invalid(reason) => Err(DevAuthError::InvalidToken(reason.to_string())),
        }
    }
}

/// Read-only verification over the codec and both stores.
#[derive(Clone)]
pub struct VerificationEngine {
    codec: Arc<TokenCodec>,
    tokens: Arc<dyn TokenStore>,
    devices: Arc<dyn DeviceRegistry>,
}

impl VerificationEngine {
    pub fn new(
        codec: Arc<TokenCodec>,
        tokens: Arc<dyn TokenStore>,
        devices: Arc<dyn DeviceRegistry>,
    ) -> Self {
        Self {
            codec,
            tokens,
            devices,
        }
    }

    /// Verify a raw token against the current time.
    ///
    /// # Errors
    ///
    /// Only store failures are errors; every verdict about the token itself
    /// is a [`Verification`].
    #[instrument(skip_all, name = "devauth.verification.verify")]
    pub async fn verify(&self, raw: &str) -> Result<Verification, DevAuthError> {
        let start = Instant::now();
        let result = self.verify_at(raw, Utc::now()).await;

        match &result {
            Ok(Verification::Invalid(reason)) => {
                record_token_verification("invalid", Some(reason.as_str()), start.elapsed())
            }
            Ok(verification) => {
                record_token_verification(verification.outcome(), None, start.elapsed())
            }
            Err(_) => record_token_verification("error", Some("internal"), start.elapsed()),
        }

        result
    }

    /// Verify a raw token as of `now`.
    pub async fn verify_at(
        &self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<Verification, DevAuthError> {
        let claims = match self.codec.decode(raw) {
            Ok(claims) => claims,
            Err(_) => return Ok(Verification::Invalid(InvalidReason::Malformed)),
        };

        let jti_hash = hash_for_correlation(&claims.jti);

        let Some(record) = self.tokens.get(&claims.jti).await? else {
            tracing::debug!(target: "devauth.service.verification", jti_hash = %jti_hash, "Token record not found");
            return Ok(Verification::Invalid(InvalidReason::UnknownToken));
        };

        if record.revoked {
            tracing::debug!(target: "devauth.service.verification", jti_hash = %jti_hash, "Token revoked");
            return Ok(Verification::Invalid(InvalidReason::Revoked));
        }

        if record.device_id != claims.sub {
            tracing::warn!(
                target: "devauth.service.verification",
                jti_hash = %jti_hash,
                "Token subject does not match stored device"
            );
            return Ok(Verification::Invalid(InvalidReason::DeviceMismatch));
        }

        // The stored expiry is authoritative
        if record.is_expired_at(now) {
            tracing::debug!(target: "devauth.service.verification", jti_hash = %jti_hash, "Token expired");
            return Ok(Verification::Expired);
        }

        let device_hash = hash_for_correlation(&record.device_id);
        let Some(device) = self.devices.get(&record.device_id).await? else {
            tracing::debug!(
                target: "devauth.service.verification",
                device_hash = %device_hash,
                "Token device not found"
            );
            return Ok(Verification::Invalid(InvalidReason::DeviceNotFound));
        };

        if !device.status.admits_tokens() {
            tracing::debug!(
                target: "devauth.service.verification",
                device_hash = %device_hash,
                status = %device.status,
                "Token device not accepted"
            );
            return Ok(Verification::Invalid(InvalidReason::DeviceNotAccepted));
        }

        Ok(Verification::Valid(claims))
    }
}
