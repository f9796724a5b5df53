//! Deterministic signing keys for testing
//!
//! The same seed always yields the same Ed25519 key, so tokens signed in one
//! test run can be compared across runs and across codecs.

use crate::test_ids::{TEST_ISSUER, TEST_KEY_ID};
use base64::engine::general_purpose;
use base64::Engine;
use devauth_service::crypto::TokenCodec;
use ring::signature::Ed25519KeyPair;
use thiserror::Error;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

/// PKCS#8 v1 prefix for an Ed25519 private key (RFC 8410); the 32-byte
/// seed follows directly.
const ED25519_PKCS8_V1_PREFIX: [u8; 16] = [
    0x30, 0x2e, // SEQUENCE, 46 bytes
    0x02, 0x01, 0x00, // INTEGER 0 (version)
    0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, // AlgorithmIdentifier, OID 1.3.101.112
    0x04, 0x22, 0x04, 0x20, // OCTET STRING { OCTET STRING (32 bytes) }
];

/// Deterministic Ed25519 private key (PKCS#8 DER) for `seed`.
///
/// # Example
/// ```rust,ignore
/// let key = test_signing_key(1)?;
/// assert_eq!(key, test_signing_key(1)?);
/// ```
pub fn test_signing_key(seed: u8) -> Result<Vec<u8>, FixtureError> {
    let mut seed_bytes = [0u8; 32];
    for (i, byte) in seed_bytes.iter_mut().enumerate() {
        *byte = seed.wrapping_mul(31).wrapping_add(i as u8);
    }

    let mut pkcs8 = ED25519_PKCS8_V1_PREFIX.to_vec();
    pkcs8.extend_from_slice(&seed_bytes);

    // Reject the document here rather than deep inside a codec
    Ed25519KeyPair::from_pkcs8_maybe_unchecked(&pkcs8)
        .map_err(|e| FixtureError::Crypto(format!("Invalid test keypair: {:?}", e)))?;

    Ok(pkcs8)
}

/// `test_signing_key(seed)` base64 encoded, the form `DEVAUTH_SIGNING_KEY` takes.
pub fn test_signing_key_base64(seed: u8) -> Result<String, FixtureError> {
    Ok(general_purpose::STANDARD.encode(test_signing_key(seed)?))
}

/// Token codec over `test_signing_key(seed)` with the test key id and issuer.
pub fn test_codec(seed: u8) -> Result<TokenCodec, FixtureError> {
    let key = test_signing_key(seed)?;
    TokenCodec::new(&key, TEST_KEY_ID, TEST_ISSUER).map_err(|e| FixtureError::Crypto(e.to_string()))
}
