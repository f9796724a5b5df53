//! PostgreSQL device registry.
//!
//! Every operation is a single SQL statement, so per-device atomicity and
//! last-writer-wins ordering come from PostgreSQL row locking.

use crate::errors::DevAuthError;
use crate::models::{Device, DeviceStatus};
use crate::observability::metrics::record_db_query;
use crate::repositories::DeviceRegistry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::str::FromStr;
use std::time::Instant;

/// Row shape of the devices table.
#[derive(Debug, sqlx::FromRow)]
struct DeviceRow {
    device_id: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DeviceRow> for Device {
    type Error = DevAuthError;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        let status = DeviceStatus::from_str(&row.status).map_err(|e| {
            DevAuthError::Database(format!("Corrupt device record: {}", e))
        })?;
        Ok(Device {
            id: row.device_id,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Device registry backed by the `devices` table.
#[derive(Clone)]
pub struct PgDeviceRegistry {
    pool: PgPool,
}

impl PgDeviceRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceRegistry for PgDeviceRegistry {
    async fn get(&self, device_id: &str) -> Result<Option<Device>, DevAuthError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, DeviceRow>(
            r#"
            SELECT device_id, status, created_at, updated_at
            FROM devices
            WHERE device_id = $1
            "#,
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await;
        let status = if result.is_ok() { "success" } else { "error" };
        record_db_query("select", "devices", status, start.elapsed());

        let row = result
            .map_err(|e| DevAuthError::Database(format!("Failed to fetch device: {}", e)))?;

        row.map(Device::try_from).transpose()
    }

    async fn create(&self, device_id: &str) -> Result<Device, DevAuthError> {
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            INSERT INTO devices (device_id, status)
            VALUES ($1, 'pending')
            ON CONFLICT (device_id) DO NOTHING
            "#,
        )
        .bind(device_id)
        .execute(&self.pool)
        .await;
        let status = if result.is_ok() { "success" } else { "error" };
        record_db_query("insert", "devices", status, start.elapsed());

        result.map_err(|e| DevAuthError::Database(format!("Failed to create device: {}", e)))?;

        self.get(device_id).await?.ok_or_else(|| {
            DevAuthError::Database("Device missing after insert".to_string())
        })
    }

    async fn set_status(
        &self,
        device_id: &str,
        status: DeviceStatus,
    ) -> Result<Option<Device>, DevAuthError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, DeviceRow>(
            r#"
            UPDATE devices
            SET status = $2, updated_at = NOW()
            WHERE device_id = $1
            RETURNING device_id, status, created_at, updated_at
            "#,
        )
        .bind(device_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await;
        let query_status = if result.is_ok() { "success" } else { "error" };
        record_db_query("update", "devices", query_status, start.elapsed());

        let row = result.map_err(|e| {
            DevAuthError::Database(format!("Failed to update device status: {}", e))
        })?;

        row.map(Device::try_from).transpose()
    }

    async fn ping(&self) -> Result<(), DevAuthError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DevAuthError::Database(format!("Device registry unreachable: {}", e)))?;
        Ok(())
    }
}
