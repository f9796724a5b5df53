//! Process-local store implementations.
//!
//! Each store holds its records behind a `tokio::sync::RwLock`; a write
//! lock is held for the whole of every mutating call, which gives the same
//! per-record atomicity and last-writer-wins ordering as the PostgreSQL
//! stores.
//!
//! Both stores carry fault toggles so callers can simulate an unreachable
//! backend, and lookup counters so callers can observe whether a code path
//! touched the store at all.

use crate::errors::DevAuthError;
use crate::models::{Device, DeviceStatus, Token};
use crate::repositories::{DeviceRegistry, TokenStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

fn unavailable(store: &str) -> DevAuthError {
    DevAuthError::Database(format!("{} unavailable", store))
}

/// In-memory [`DeviceRegistry`].
#[derive(Debug, Default)]
pub struct InMemoryDeviceRegistry {
    devices: RwLock<HashMap<String, Device>>,
    unavailable: AtomicBool,
    lookups: AtomicUsize,
}

impl InMemoryDeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a device record directly.
    pub async fn insert(&self, device: Device) {
        self.devices.write().await.insert(device.id.clone(), device);
    }

    /// Make every subsequent call fail with a database error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `get` calls served so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), DevAuthError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable("Device registry"));
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceRegistry for InMemoryDeviceRegistry {
    async fn get(&self, device_id: &str) -> Result<Option<Device>, DevAuthError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.devices.read().await.get(device_id).cloned())
    }

    async fn create(&self, device_id: &str) -> Result<Device, DevAuthError> {
        self.check_available()?;
        let mut devices = self.devices.write().await;
        let device = devices
            .entry(device_id.to_string())
            .or_insert_with(|| Device::new(device_id));
        Ok(device.clone())
    }

    async fn set_status(
        &self,
        device_id: &str,
        status: DeviceStatus,
    ) -> Result<Option<Device>, DevAuthError> {
        self.check_available()?;
        let mut devices = self.devices.write().await;
        Ok(devices.get_mut(device_id).map(|device| {
            device.status = status;
            device.updated_at = Utc::now();
            device.clone()
        }))
    }

    async fn ping(&self) -> Result<(), DevAuthError> {
        self.check_available()
    }
}

/// In-memory [`TokenStore`].
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    tokens: RwLock<HashMap<String, Token>>,
    unavailable: AtomicBool,
    fail_bulk_revocation: AtomicBool,
    lookups: AtomicUsize,
    bulk_revocations: AtomicUsize,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a token record directly.
    pub async fn insert(&self, token: Token) {
        self.tokens.write().await.insert(token.jti.clone(), token);
    }

    /// Make every subsequent call fail with a database error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make only `revoke_all_for_device` fail.
    pub fn set_fail_bulk_revocation(&self, fail: bool) {
        self.fail_bulk_revocation.store(fail, Ordering::SeqCst);
    }

    /// Number of `get` calls served so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of `revoke_all_for_device` calls attempted so far.
    pub fn bulk_revocation_count(&self) -> usize {
        self.bulk_revocations.load(Ordering::SeqCst)
    }

    /// Number of stored records, tombstones included.
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }

    fn check_available(&self) -> Result<(), DevAuthError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable("Token store"));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn create(&self, token: &Token) -> Result<(), DevAuthError> {
        self.check_available()?;
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&token.jti) {
            return Err(DevAuthError::Database(
                "Duplicate token identifier".to_string(),
            ));
        }
        tokens.insert(token.jti.clone(), token.clone());
        Ok(())
    }

    async fn get(&self, jti: &str) -> Result<Option<Token>, DevAuthError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.tokens.read().await.get(jti).cloned())
    }

    async fn revoke(&self, jti: &str) -> Result<bool, DevAuthError> {
        self.check_available()?;
        let mut tokens = self.tokens.write().await;
        Ok(tokens
            .get_mut(jti)
            .map(|token| token.revoked = true)
            .is_some())
    }

    async fn delete(&self, jti: &str) -> Result<bool, DevAuthError> {
        self.check_available()?;
        Ok(self.tokens.write().await.remove(jti).is_some())
    }

    async fn revoke_all_for_device(&self, device_id: &str) -> Result<u64, DevAuthError> {
        self.bulk_revocations.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        if self.fail_bulk_revocation.load(Ordering::SeqCst) {
            return Err(unavailable("Token store"));
        }

        let mut tokens = self.tokens.write().await;
        let mut revoked = 0u64;
        for token in tokens
            .values_mut()
            .filter(|t| t.device_id == device_id && !t.revoked)
        {
            token.revoked = true;
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, DevAuthError> {
        self.check_available()?;
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, token| token.expires_at >= cutoff);
        Ok((before - tokens.len()) as u64)
    }

    async fn ping(&self) -> Result<(), DevAuthError> {
        self.check_available()
    }
}
