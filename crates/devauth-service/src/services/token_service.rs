//! Token lifecycle operations outside verification.
//!
//! Issuance is exposed to the enrollment collaborator and to tests only;
//! there is no issuance endpoint.

use crate::crypto::{TokenClaims, TokenCodec};
use crate::errors::DevAuthError;
use crate::models::Token;
use crate::observability::hash_for_correlation;
use crate::observability::metrics::{record_token_issuance, record_token_revocation};
use crate::repositories::TokenStore;
use chrono::{Duration, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// A freshly issued token: the signed string handed to the device and the
/// record kept in the token store.
#[derive(Clone)]
pub struct IssuedToken {
    pub raw: String,
    pub record: Token,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("raw", &"[REDACTED]")
            .field("record", &self.record)
            .finish()
    }
}

/// Issues tokens with the configured lifetime over one codec and token store.
#[derive(Clone)]
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    tokens: Arc<dyn TokenStore>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(codec: Arc<TokenCodec>, tokens: Arc<dyn TokenStore>, ttl: Duration) -> Self {
        Self { codec, tokens, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `device_id` valid for the configured lifetime.
    pub async fn issue(&self, device_id: &str) -> Result<IssuedToken, DevAuthError> {
        issue_device_token(&self.codec, self.tokens.as_ref(), device_id, self.ttl).await
    }
}

/// Issue a token for `device_id`, valid for `ttl` from now.
///
/// The device's admission status is not consulted; a token for a device
/// that is not accepted simply fails verification until it is.
#[instrument(skip_all, name = "devauth.token.issue")]
pub async fn issue_device_token(
    codec: &TokenCodec,
    tokens: &dyn TokenStore,
    device_id: &str,
    ttl: Duration,
) -> Result<IssuedToken, DevAuthError> {
    if device_id.is_empty() {
        return Err(DevAuthError::BadRequest(
            "Device id must not be empty".to_string(),
        ));
    }

    let issued_at = Utc::now();
    let expires_at = issued_at + ttl;
    let claims = TokenClaims::new(device_id, codec.issuer(), issued_at, expires_at);

    let raw = match codec.encode(&claims) {
        Ok(raw) => raw,
        Err(e) => {
            record_token_issuance("error");
            return Err(e);
        }
    };

    // Stored with second precision, matching the signed claims
    let record = Token {
        jti: claims.jti.clone(),
        device_id: device_id.to_string(),
        issued_at: chrono::DateTime::from_timestamp(claims.iat, 0).unwrap_or(issued_at),
        expires_at: chrono::DateTime::from_timestamp(claims.exp, 0).unwrap_or(expires_at),
        revoked: false,
    };

    if let Err(e) = tokens.create(&record).await {
        record_token_issuance("error");
        return Err(e);
    }

    record_token_issuance("success");
    tracing::info!(
        target: "devauth.service.token",
        device_hash = %hash_for_correlation(device_id),
        jti_hash = %hash_for_correlation(&record.jti),
        expires_at = %record.expires_at,
        "Issued device token"
    );

    Ok(IssuedToken { raw, record })
}

/// Physically delete a token record.
///
/// # Errors
///
/// - `DevAuthError::NotFound` - no such token (including a repeated delete)
#[instrument(skip_all, name = "devauth.token.delete")]
pub async fn delete_token(tokens: &dyn TokenStore, jti: &str) -> Result<(), DevAuthError> {
    let jti_hash = hash_for_correlation(jti);

    if !tokens.delete(jti).await? {
        tracing::debug!(target: "devauth.service.token", jti_hash = %jti_hash, "Token not found for deletion");
        return Err(DevAuthError::NotFound("Token not found".to_string()));
    }

    record_token_revocation("delete", 1);
    tracing::info!(target: "devauth.service.token", jti_hash = %jti_hash, "Token deleted");
    Ok(())
}

/// Revoke all unrevoked tokens of a device, returning how many changed.
#[instrument(skip_all, name = "devauth.token.revoke_device")]
pub async fn revoke_device_tokens(
    tokens: &dyn TokenStore,
    device_id: &str,
) -> Result<u64, DevAuthError> {
    let count = tokens.revoke_all_for_device(device_id).await?;

    record_token_revocation("device", count);
    tracing::info!(
        target: "devauth.service.token",
        device_hash = %hash_for_correlation(device_id),
        revoked = count,
        "Revoked device tokens"
    );
    Ok(count)
}
