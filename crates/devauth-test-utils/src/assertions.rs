//! Custom test assertions for expressive tests
//!
//! - [`TokenAssertions`] inspects raw device tokens without verifying them
//! - [`ErrorBodyAssertions`] checks the service's JSON error envelope

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

/// JWT header structure
#[derive(Debug, Deserialize)]
struct JwtHeader {
    pub alg: String,
    pub typ: String,
    #[serde(default)]
    pub kid: Option<String>,
}

/// Device token claims as they appear on the wire
#[derive(Debug, Deserialize)]
struct JwtClaims {
    pub jti: String,
    pub sub: String,
    pub exp: i64,
}

fn token_part(token: &str, index: usize) -> Vec<u8> {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("Token has no part {}", index));
    URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("Token part {} is not base64url: {}", index, e))
}

fn header_of(token: &str) -> JwtHeader {
    serde_json::from_slice(&token_part(token, 0)).expect("Failed to parse JWT header")
}

fn claims_of(token: &str) -> JwtClaims {
    serde_json::from_slice(&token_part(token, 1)).expect("Failed to parse JWT claims")
}

/// Custom assertions for raw tokens
///
/// # Example
/// ```rust,ignore
/// issued.raw
///     .assert_valid_jwt()
///     .assert_for_device("dev-1")
///     .assert_signed_by("test-key-2025-01");
/// ```
pub trait TokenAssertions {
    /// Assert the token is a three-part EdDSA JWT with device claims
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert that the token was signed by the specified key
    fn assert_signed_by(&self, key_id: &str) -> &Self;

    /// Assert that the token is for the specified device
    fn assert_for_device(&self, device_id: &str) -> &Self;

    /// Assert that the token carries the specified token id
    fn assert_has_jti(&self, jti: &str) -> &Self;

    /// Assert that the token expires within the specified seconds
    fn assert_expires_in(&self, seconds: u64) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let parts = self.split('.').count();
        assert_eq!(
            parts, 3,
            "JWT must have 3 parts (header.payload.signature), got {}",
            parts
        );

        let header = header_of(self);
        assert_eq!(header.alg, "EdDSA", "Expected EdDSA algorithm");
        assert_eq!(header.typ, "JWT", "Expected JWT type");

        let claims = claims_of(self);
        assert!(!claims.jti.is_empty(), "Token id must not be empty");
        assert!(!claims.sub.is_empty(), "Device id must not be empty");

        self
    }

    fn assert_signed_by(&self, key_id: &str) -> &Self {
        let header = header_of(self);
        assert_eq!(
            header.kid.as_deref(),
            Some(key_id),
            "Expected key_id '{}', got {:?}",
            key_id,
            header.kid
        );
        self
    }

    fn assert_for_device(&self, device_id: &str) -> &Self {
        let claims = claims_of(self);
        assert_eq!(
            claims.sub, device_id,
            "Expected device '{}', got '{}'",
            device_id, claims.sub
        );
        self
    }

    fn assert_has_jti(&self, jti: &str) -> &Self {
        let claims = claims_of(self);
        assert_eq!(claims.jti, jti, "Expected jti '{}', got '{}'", jti, claims.jti);
        self
    }

    fn assert_expires_in(&self, seconds: u64) -> &Self {
        let claims = claims_of(self);
        let expires_in = claims.exp - chrono::Utc::now().timestamp();

        // Allow 5-second tolerance for slow test runners
        assert!(
            (expires_in - seconds as i64).abs() <= 5,
            "Expected token to expire in {} seconds, but expires in {} seconds",
            seconds,
            expires_in
        );
        self
    }
}

/// Assertions over a `{"error": {"code", "message", "request_id"}}` body
pub trait ErrorBodyAssertions {
    /// Assert the error code (e.g. `INVALID_TOKEN`)
    fn assert_error_code(&self, code: &str) -> &Self;

    /// Assert the body echoes the request id
    fn assert_request_id(&self, request_id: &str) -> &Self;

    /// Assert the message contains `fragment`
    fn assert_message_contains(&self, fragment: &str) -> &Self;
}

impl ErrorBodyAssertions for serde_json::Value {
    fn assert_error_code(&self, code: &str) -> &Self {
        assert_eq!(
            self["error"]["code"], code,
            "Unexpected error code in body: {}",
            self
        );
        self
    }

    fn assert_request_id(&self, request_id: &str) -> &Self {
        assert_eq!(
            self["error"]["request_id"], request_id,
            "Unexpected request id in body: {}",
            self
        );
        self
    }

    fn assert_message_contains(&self, fragment: &str) -> &Self {
        let message = self["error"]["message"].as_str().unwrap_or_default();
        assert!(
            message.contains(fragment),
            "Expected message containing '{}', got '{}'",
            fragment,
            message
        );
        self
    }
}
