//! Fixed test IDs for deterministic tests
//!
//! Using fixed identifiers keeps log output and failure messages stable
//! across runs.

// Device IDs
pub const TEST_DEVICE_ID_1: &str = "dev-1";
pub const TEST_DEVICE_ID_2: &str = "dev-2";
pub const TEST_DEVICE_ID_UNKNOWN: &str = "dev-unknown";

// Token IDs
pub const TEST_JTI_1: &str = "jti-1";
pub const TEST_JTI_2: &str = "jti-2";
pub const TEST_JTI_3: &str = "jti-3";

// Signing identity
pub const TEST_KEY_ID: &str = "test-key-2025-01";
pub const TEST_ISSUER: &str = "device-auth-test";
