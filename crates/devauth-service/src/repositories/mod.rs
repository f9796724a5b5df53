//! Storage layer.
//!
//! The service consumes two durable stores through traits so that handlers
//! and services never depend on a concrete backend:
//!
//! - [`DeviceRegistry`] - device id -> admission status
//! - [`TokenStore`] - jti -> token record
//!
//! Atomicity is delegated to the backend: every method is a single atomic
//! operation on one record (or, for bulk methods, atomic per record). No
//! method spans both stores.
//!
//! Implementations:
//! - [`devices::PgDeviceRegistry`], [`tokens::PgTokenStore`] - PostgreSQL
//! - [`memory::InMemoryDeviceRegistry`], [`memory::InMemoryTokenStore`] -
//!   process-local, used by tests and local development

pub mod devices;
pub mod memory;
pub mod tokens;

use crate::errors::DevAuthError;
use crate::models::{Device, DeviceStatus, Token};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use devices::PgDeviceRegistry;
pub use memory::{InMemoryDeviceRegistry, InMemoryTokenStore};
pub use tokens::PgTokenStore;

/// Durable device id -> admission status mapping.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Look up a device. `None` means the device does not exist.
    async fn get(&self, device_id: &str) -> Result<Option<Device>, DevAuthError>;

    /// Register a device as pending. An existing device is returned unchanged.
    ///
    /// Enrollment boundary; this service never deletes devices.
    async fn create(&self, device_id: &str) -> Result<Device, DevAuthError>;

    /// Atomically replace the device's status, returning the updated record.
    ///
    /// Concurrent writers on the same id are serialized by the backend and
    /// the last committed write wins. The write is durable when this returns.
    /// `None` means the device does not exist.
    async fn set_status(
        &self,
        device_id: &str,
        status: DeviceStatus,
    ) -> Result<Option<Device>, DevAuthError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), DevAuthError>;
}

/// Durable jti -> token record mapping.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Store a newly issued token. A duplicate jti is an error.
    async fn create(&self, token: &Token) -> Result<(), DevAuthError>;

    /// Look up a token record. `None` means unknown (or deleted).
    async fn get(&self, jti: &str) -> Result<Option<Token>, DevAuthError>;

    /// Mark a token revoked, keeping the record as a tombstone.
    ///
    /// Returns `false` if no such token exists. Revoking an already
    /// revoked token succeeds.
    async fn revoke(&self, jti: &str) -> Result<bool, DevAuthError>;

    /// Physically remove a token record. Returns `false` if no such token
    /// exists, so a repeated delete reports not found.
    async fn delete(&self, jti: &str) -> Result<bool, DevAuthError>;

    /// Revoke every unrevoked token of a device, returning how many changed.
    ///
    /// Each token's revocation is atomic; a token is never half-revoked.
    async fn revoke_all_for_device(&self, device_id: &str) -> Result<u64, DevAuthError>;

    /// Remove tokens that expired before `cutoff`, returning how many.
    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, DevAuthError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), DevAuthError>;
}
