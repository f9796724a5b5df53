//! Builder patterns for test token construction
//!
//! A [`TestTokenBuilder`] produces a signed token string and the matching
//! store record from one description, so the two never disagree.

use crate::test_ids::{TEST_DEVICE_ID_1, TEST_ISSUER, TEST_JTI_1};
use chrono::{DateTime, Duration, Utc};
use devauth_service::crypto::{TokenClaims, TokenCodec};
use devauth_service::models::Token;

/// Builder for device tokens
///
/// # Example
/// ```rust,ignore
/// let builder = TestTokenBuilder::new()
///     .for_device("dev-1")
///     .with_jti("jti-1")
///     .expires_in(3600);
/// tokens.insert(builder.record()).await;
/// let raw = builder.sign(&codec)?;
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    jti: String,
    device_id: String,
    issuer: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

impl TestTokenBuilder {
    /// A token for `dev-1` with id `jti-1`, valid for one hour.
    pub fn new() -> Self {
        // Whole seconds, matching what survives signing
        let now = DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap_or_else(Utc::now);
        Self {
            jti: TEST_JTI_1.to_string(),
            device_id: TEST_DEVICE_ID_1.to_string(),
            issuer: TEST_ISSUER.to_string(),
            issued_at: now,
            expires_at: now + Duration::seconds(3600),
            revoked: false,
        }
    }

    pub fn for_device(mut self, device_id: &str) -> Self {
        self.device_id = device_id.to_string();
        self
    }

    pub fn with_jti(mut self, jti: &str) -> Self {
        self.jti = jti.to_string();
        self
    }

    /// Override the issuer claim (the record has no issuer).
    pub fn issued_by(mut self, issuer: &str) -> Self {
        self.issuer = issuer.to_string();
        self
    }

    /// Set expiration in seconds from now
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.expires_at = self.issued_at + Duration::seconds(seconds);
        self
    }

    /// Make the token expired `seconds` ago, issued an hour before that.
    pub fn expired_seconds_ago(mut self, seconds: i64) -> Self {
        self.expires_at = self.issued_at - Duration::seconds(seconds);
        self.issued_at = self.expires_at - Duration::seconds(3600);
        self
    }

    /// Mark the store record revoked.
    pub fn revoked(mut self) -> Self {
        self.revoked = true;
        self
    }

    pub fn claims(&self) -> TokenClaims {
        let mut claims =
            TokenClaims::new(&self.device_id, &self.issuer, self.issued_at, self.expires_at);
        claims.jti = self.jti.clone();
        claims
    }

    /// Sign the claims with `codec`.
    pub fn sign(&self, codec: &TokenCodec) -> Result<String, anyhow::Error> {
        codec
            .encode(&self.claims())
            .map_err(|e| anyhow::anyhow!("Failed to sign test token: {}", e))
    }

    /// The token store record for these claims.
    pub fn record(&self) -> Token {
        Token {
            jti: self.jti.clone(),
            device_id: self.device_id.clone(),
            issued_at: self.issued_at,
            expires_at: self.expires_at,
            revoked: self.revoked,
        }
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
