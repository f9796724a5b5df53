//! # Device Auth Test Utilities
//!
//! Shared test utilities for the device auth service.
//!
//! This crate provides:
//! - Deterministic signing keys and codecs
//! - Test token builders (signed token plus matching store record)
//! - Server test harness (TestDevAuthServer for E2E tests)
//! - Fixed test IDs
//! - Custom assertions (TokenAssertions, ErrorBodyAssertions)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use devauth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestDevAuthServer::spawn().await?;
//!
//!     let token = TestTokenBuilder::new().for_device(TEST_DEVICE_ID_1);
//!     server.tokens().insert(token.record()).await;
//!     let raw = token.sign(server.codec())?;
//!
//!     raw.assert_valid_jwt().assert_for_device(TEST_DEVICE_ID_1);
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod server_harness;
pub mod test_ids;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use test_ids::*;
pub use token_builders::*;
