//! Device admission controller.
//!
//! Applies operator status decisions to the device registry. Any status
//! other than `accepted` triggers a best-effort cascade that revokes the
//! device's stored tokens.
//!
//! The status write and the cascade are separate store operations with no
//! transaction between them. A failed cascade is logged and counted but
//! never fails the update: tokens left unrevoked are still refused by the
//! verification engine, which re-reads the device status on every call.

use crate::errors::DevAuthError;
use crate::models::{Device, DeviceStatus};
use crate::observability::hash_for_correlation;
use crate::observability::metrics::{
    record_cascade_failure, record_status_update, record_token_revocation,
};
use crate::repositories::{DeviceRegistry, TokenStore};
use std::sync::Arc;
use tracing::instrument;

#[derive(Clone)]
pub struct AdmissionController {
    devices: Arc<dyn DeviceRegistry>,
    tokens: Arc<dyn TokenStore>,
}

impl AdmissionController {
    pub fn new(devices: Arc<dyn DeviceRegistry>, tokens: Arc<dyn TokenStore>) -> Self {
        Self { devices, tokens }
    }

    /// Set a device's admission status.
    ///
    /// Every transition is allowed, including setting the current status
    /// again. Returns the updated device.
    ///
    /// # Errors
    ///
    /// - `DevAuthError::NotFound` - the device does not exist (nothing written)
    /// - `DevAuthError::Database` - the status write failed
    #[instrument(skip_all, name = "devauth.admission.update_status", fields(status = %status))]
    pub async fn update_status(
        &self,
        device_id: &str,
        status: DeviceStatus,
    ) -> Result<Device, DevAuthError> {
        let device_hash = hash_for_correlation(device_id);

        let device = match self.devices.set_status(device_id, status).await {
            Ok(Some(device)) => device,
            Ok(None) => {
                record_status_update(status.as_str(), "not_found");
                return Err(DevAuthError::NotFound("Device not found".to_string()));
            }
            Err(e) => {
                record_status_update(status.as_str(), "error");
                return Err(e);
            }
        };

        record_status_update(status.as_str(), "success");
        tracing::info!(
            target: "devauth.service.admission",
            device_hash = %device_hash,
            status = %status,
            "Device status updated"
        );

        if !status.admits_tokens() {
            self.cascade_revocation(device_id, &device_hash).await;
        }

        Ok(device)
    }

    /// Look up a device.
    #[instrument(skip_all, name = "devauth.admission.get_device")]
    pub async fn get_device(&self, device_id: &str) -> Result<Device, DevAuthError> {
        self.devices
            .get(device_id)
            .await?
            .ok_or_else(|| DevAuthError::NotFound("Device not found".to_string()))
    }

    async fn cascade_revocation(&self, device_id: &str, device_hash: &str) {
        match self.tokens.revoke_all_for_device(device_id).await {
            Ok(count) => {
                record_token_revocation("cascade", count);
                tracing::info!(
                    target: "devauth.service.admission",
                    device_hash = %device_hash,
                    revoked = count,
                    "Revoked device tokens"
                );
            }
            Err(e) => {
                record_cascade_failure();
                tracing::warn!(
                    target: "devauth.service.admission",
                    device_hash = %device_hash,
                    error = %e,
                    "Token revocation cascade failed; verification still refuses the device's tokens"
                );
            }
        }
    }
}
