//! Background tasks for the device auth service.
//!
//! # Tasks
//!
//! - `token_cleanup` - Purges token records long past their expiry

pub mod token_cleanup;

pub use token_cleanup::{start_token_cleanup, TokenCleanupConfig};
