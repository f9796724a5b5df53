//! Token codec: EdDSA (Ed25519) signed JWTs.
//!
//! [`TokenCodec::decode`] checks structure, algorithm, signature and issuer
//! only. It is pure: it never consults the clock, the stores or the network,
//! so expiry is left to the verification engine, which must report it as a
//! distinct outcome.

use crate::errors::DevAuthError;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::{
    rand::SystemRandom,
    signature::{Ed25519KeyPair, KeyPair},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

/// Maximum allowed token size in bytes (4KB).
///
/// Oversized tokens are rejected before base64 decoding or signature
/// verification. Typical device tokens are ~300 bytes.
pub const MAX_TOKEN_SIZE_BYTES: usize = 4096;

/// Device token claims.
///
/// `sub` is the device id and `jti` the token id; both are identifiers that
/// must not reach logs, so Debug redacts them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Unique token identifier, primary key for revocation lookups
    pub jti: String,
    /// Subject (device id)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

impl TokenClaims {
    /// Claims for a new token issued to `device_id`.
    pub fn new(
        device_id: &str,
        issuer: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            jti: generate_jti(),
            sub: device_id.to_string(),
            iss: issuer.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.sub
    }
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("jti", &"[REDACTED]")
            .field("sub", &"[REDACTED]")
            .field("iss", &self.iss)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish()
    }
}

/// Any decode failure: bad encoding, bad signature, unsupported algorithm,
/// wrong issuer or missing claims. The cause is only logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Malformed token")]
pub struct MalformedToken;

/// Generate a unique token id.
pub fn generate_jti() -> String {
    Uuid::new_v4().to_string()
}

/// Generate an Ed25519 keypair using CSPRNG.
///
/// Returns the PKCS#8 v2 document expected by [`TokenCodec::new`] and by the
/// `DEVAUTH_SIGNING_KEY` setting (base64 encoded).
#[instrument(skip_all)]
pub fn generate_signing_key() -> Result<Vec<u8>, DevAuthError> {
    let rng = SystemRandom::new();
    let pkcs8_bytes = Ed25519KeyPair::generate_pkcs8(&rng)
        .map_err(|e| DevAuthError::Crypto(format!("Keypair generation failed: {}", e)))?;
    Ok(pkcs8_bytes.as_ref().to_vec())
}

/// Encodes, signs, decodes and verifies device tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    key_id: String,
    issuer: String,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("encoding_key", &"[REDACTED]")
            .field("key_id", &self.key_id)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl TokenCodec {
    /// Build a codec from an Ed25519 PKCS#8 private key.
    ///
    /// The public verification key is derived from the private key.
    pub fn new(private_key_pkcs8: &[u8], key_id: &str, issuer: &str) -> Result<Self, DevAuthError> {
        let key_pair = Ed25519KeyPair::from_pkcs8_maybe_unchecked(private_key_pkcs8)
            .map_err(|e| DevAuthError::Crypto(format!("Invalid private key format: {}", e)))?;
        let public_key_bytes = key_pair.public_key().as_ref();

        let mut validation = Validation::new(Algorithm::EdDSA);
        // Expiry is classified by the verification engine, not here
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.set_issuer(&[issuer]);

        Ok(Self {
            encoding_key: EncodingKey::from_ed_der(private_key_pkcs8),
            decoding_key: DecodingKey::from_ed_der(public_key_bytes),
            validation,
            key_id: key_id.to_string(),
            issuer: issuer.to_string(),
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Sign claims into a compact JWT.
    #[instrument(skip_all)]
    pub fn encode(&self, claims: &TokenClaims) -> Result<String, DevAuthError> {
        let mut header = Header::new(Algorithm::EdDSA);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.key_id.clone());

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| DevAuthError::Crypto(format!("JWT signing operation failed: {}", e)))
    }

    /// Decode and verify a raw token.
    #[instrument(skip_all)]
    pub fn decode(&self, raw: &str) -> Result<TokenClaims, MalformedToken> {
        if raw.len() > MAX_TOKEN_SIZE_BYTES {
            tracing::debug!(
                target: "devauth.crypto",
                token_size = raw.len(),
                max_size = MAX_TOKEN_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(MalformedToken);
        }

        let token_data =
            decode::<TokenClaims>(raw, &self.decoding_key, &self.validation).map_err(|e| {
                tracing::debug!(target: "devauth.crypto", error = %e, "Token decode failed");
                MalformedToken
            })?;

        let claims = token_data.claims;
        if claims.jti.is_empty() || claims.sub.is_empty() {
            tracing::debug!(target: "devauth.crypto", "Token rejected: empty jti or sub");
            return Err(MalformedToken);
        }

        Ok(claims)
    }
}
