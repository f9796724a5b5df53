use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Device admission status.
///
/// Every status is reachable from every other status; operators may
/// re-accept a rejected device or move an accepted one back to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl DeviceStatus {
    pub const ALL: [DeviceStatus; 3] = [
        DeviceStatus::Pending,
        DeviceStatus::Accepted,
        DeviceStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Pending => "pending",
            DeviceStatus::Accepted => "accepted",
            DeviceStatus::Rejected => "rejected",
        }
    }

    /// Whether tokens of a device in this status may grant access.
    pub fn admits_tokens(&self) -> bool {
        matches!(self, DeviceStatus::Accepted)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeviceStatus::Pending),
            "accepted" => Ok(DeviceStatus::Accepted),
            "rejected" => Ok(DeviceStatus::Rejected),
            _ => Err(format!("Invalid device status: {}", s)),
        }
    }
}

/// Device admission record (maps to devices table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub id: String,
    pub status: DeviceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Device {
    /// A freshly enrolled device, pending admission.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: DeviceStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Token record (maps to tokens table)
///
/// `jti` and `device_id` are identifiers that should not appear in logs
/// unhashed; Debug redacts them.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub jti: String,
    pub device_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl Token {
    /// Whether the token's expiry lies at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("jti", &"[REDACTED]")
            .field("device_id", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("revoked", &self.revoked)
            .finish()
    }
}

/// Body of `PUT /devices/:id/status`.
///
/// `status` stays a string so that unknown values surface as a
/// `BAD_REQUEST` error body rather than an extractor rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Device as returned by the management API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceResponse {
    pub id: String,
    pub status: DeviceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Device> for DeviceResponse {
    fn from(device: Device) -> Self {
        Self {
            id: device.id,
            status: device.status,
            created_at: device.created_at,
            updated_at: device.updated_at,
        }
    }
}

/// Query of `DELETE /tokens?device_id=...`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceTokensQuery {
    pub device_id: Option<String>,
}

/// Readiness probe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub device_registry: String,
    pub token_store: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
