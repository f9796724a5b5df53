//! Observability for the device auth service.
//!
//! # Privacy by Default
//!
//! All instrumentation uses `#[instrument(skip_all)]` and explicit safe field allow-listing.
//! Fields are categorized as:
//! - **SAFE**: Can be logged in plaintext (statuses, outcomes, counts)
//! - **HASHED**: Must be SHA-256 hashed for correlation (device_id, jti)
//! - **NEVER**: Must never appear in logs (raw tokens, signing keys)

pub mod metrics;

use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars)
///
/// Used for device ids and token ids, which need correlation across log
/// entries but should not be stored in plaintext.
///
/// This is a one-way hash for correlation only, not a secret-safe digest.
pub fn hash_for_correlation(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let result = hasher.finalize();
    // 32 bits: enough for correlation, limits reversibility
    hex::encode(result.get(..4).unwrap_or_default())
}
