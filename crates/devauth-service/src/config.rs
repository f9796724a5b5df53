//! Device auth service configuration.
//!
//! Configuration is loaded from environment variables. The signing key is
//! held in a [`SecretBox`] and every sensitive field is redacted in Debug
//! output.

use base64::{engine::general_purpose, Engine as _};
use ring::signature::Ed25519KeyPair;
use secrecy::{ExposeSecret, SecretBox};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default `kid` placed in token headers.
pub const DEFAULT_KEY_ID: &str = "devauth-key-01";

/// Default `iss` claim.
pub const DEFAULT_ISSUER: &str = "device-auth";

/// Default token lifetime (7 days).
pub const DEFAULT_TOKEN_TTL_SECONDS: u64 = 604_800;

/// Bounds for the token lifetime (1 minute to 1 year).
pub const MIN_TOKEN_TTL_SECONDS: u64 = 60;
pub const MAX_TOKEN_TTL_SECONDS: u64 = 31_536_000;

/// Default interval between expired-token purges (1 hour). 0 disables.
pub const DEFAULT_TOKEN_CLEANUP_INTERVAL_SECONDS: u64 = 3600;

/// Upper bound for the purge interval (1 week).
pub const MAX_TOKEN_CLEANUP_INTERVAL_SECONDS: u64 = 604_800;

/// Default time an expired token is kept before purging (1 day).
pub const DEFAULT_TOKEN_RETENTION_SECONDS: u64 = 86_400;

/// Upper bound for the retention period (1 year).
pub const MAX_TOKEN_RETENTION_SECONDS: u64 = 31_536_000;

/// Default graceful shutdown drain period.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Device auth service configuration.
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Ed25519 private key, PKCS#8 DER.
    pub signing_key: SecretBox<Vec<u8>>,

    /// Key id placed in the `kid` header of issued tokens.
    pub key_id: String,

    /// Issuer placed in, and required of, every token.
    pub issuer: String,

    /// Lifetime of issued tokens.
    pub token_ttl_seconds: u64,

    /// Interval of the expired-token purge task; 0 disables the task.
    pub token_cleanup_interval_seconds: u64,

    /// How long an expired token is kept before it is purged.
    pub token_retention_seconds: u64,

    /// Drain period after a shutdown signal.
    pub drain_seconds: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("signing_key", &"[REDACTED]")
            .field("key_id", &self.key_id)
            .field("issuer", &self.issuer)
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field(
                "token_cleanup_interval_seconds",
                &self.token_cleanup_interval_seconds,
            )
            .field("token_retention_seconds", &self.token_retention_seconds)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid signing key: {0}")]
    InvalidSigningKey(String),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Invalid token TTL configuration: {0}")]
    InvalidTokenTtl(String),

    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let signing_key_base64 = vars
            .get("DEVAUTH_SIGNING_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("DEVAUTH_SIGNING_KEY".to_string()))?;

        let signing_key = general_purpose::STANDARD
            .decode(signing_key_base64.trim())
            .map_err(ConfigError::Base64Error)?;

        // Reject keys that cannot sign before the server starts
        Ed25519KeyPair::from_pkcs8_maybe_unchecked(&signing_key).map_err(|e| {
            ConfigError::InvalidSigningKey(format!("Expected Ed25519 PKCS#8 document: {}", e))
        })?;

        let key_id = vars
            .get("DEVAUTH_KEY_ID")
            .cloned()
            .unwrap_or_else(|| DEFAULT_KEY_ID.to_string());

        let issuer = vars
            .get("DEVAUTH_ISSUER")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ISSUER.to_string());

        let token_ttl_seconds = if let Some(value_str) = vars.get("DEVAUTH_TOKEN_TTL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidTokenTtl(format!(
                    "DEVAUTH_TOKEN_TTL_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if !(MIN_TOKEN_TTL_SECONDS..=MAX_TOKEN_TTL_SECONDS).contains(&value) {
                return Err(ConfigError::InvalidTokenTtl(format!(
                    "DEVAUTH_TOKEN_TTL_SECONDS must be between {} and {}, got {}",
                    MIN_TOKEN_TTL_SECONDS, MAX_TOKEN_TTL_SECONDS, value
                )));
            }

            value
        } else {
            DEFAULT_TOKEN_TTL_SECONDS
        };

        let token_cleanup_interval_seconds = parse_bounded_seconds(
            vars,
            "DEVAUTH_TOKEN_CLEANUP_INTERVAL_SECONDS",
            DEFAULT_TOKEN_CLEANUP_INTERVAL_SECONDS,
            MAX_TOKEN_CLEANUP_INTERVAL_SECONDS,
        )?;

        let token_retention_seconds = parse_bounded_seconds(
            vars,
            "DEVAUTH_TOKEN_RETENTION_SECONDS",
            DEFAULT_TOKEN_RETENTION_SECONDS,
            MAX_TOKEN_RETENTION_SECONDS,
        )?;

        let drain_seconds = parse_seconds(vars, "DEVAUTH_DRAIN_SECONDS", DEFAULT_DRAIN_SECONDS)?;

        Ok(Config {
            database_url,
            bind_address,
            signing_key: SecretBox::new(Box::new(signing_key)),
            key_id,
            issuer,
            token_ttl_seconds,
            token_cleanup_interval_seconds,
            token_retention_seconds,
            drain_seconds,
        })
    }

    /// Raw PKCS#8 signing key.
    pub fn signing_key_bytes(&self) -> &[u8] {
        self.signing_key.expose_secret()
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_seconds)
    }

    pub fn token_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.token_cleanup_interval_seconds)
    }

    pub fn token_retention(&self) -> Duration {
        Duration::from_secs(self.token_retention_seconds)
    }
}

fn parse_seconds(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match vars.get(name) {
        Some(value_str) => value_str.parse().map_err(|e| ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!(
                "must be a non-negative integer, got '{}': {}",
                value_str, e
            ),
        }),
        None => Ok(default),
    }
}

fn parse_bounded_seconds(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
    max: u64,
) -> Result<u64, ConfigError> {
    let value = parse_seconds(vars, name, default)?;
    if value > max {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("must be at most {}, got {}", max, value),
        });
    }
    Ok(value)
}
