//! Expired token cleanup background task.
//!
//! Periodically removes token records whose expiry lies further in the past
//! than the retention period. Expired tokens already fail verification, so
//! the purge only bounds storage growth. A purged token verifies as unknown
//! instead of expired.
//!
//! # Graceful Shutdown
//!
//! The task supports graceful shutdown via a cancellation token. When the token
//! is cancelled, the task completes its current iteration and exits cleanly.

use crate::config::Config;
use crate::errors::DevAuthError;
use crate::observability::metrics::record_tokens_purged;
use crate::repositories::TokenStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Configuration for the token cleanup task.
#[derive(Debug, Clone)]
pub struct TokenCleanupConfig {
    /// Time between purges. Zero disables the task.
    pub interval: Duration,
    /// How long an expired token is kept before it is purged.
    pub retention: Duration,
}

impl TokenCleanupConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.token_cleanup_interval(),
            retention: config.token_retention(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }
}

/// Start the token cleanup background task.
///
/// Runs one purge per interval (the first immediately) until the
/// cancellation token is triggered. Returns at once if the task is disabled.
#[instrument(skip_all, name = "devauth.task.token_cleanup")]
pub async fn start_token_cleanup(
    tokens: Arc<dyn TokenStore>,
    config: TokenCleanupConfig,
    cancel_token: CancellationToken,
) {
    if !config.is_enabled() {
        info!(
            target: "devauth.task.token_cleanup",
            "Token cleanup disabled (interval is 0)"
        );
        return;
    }

    info!(
        target: "devauth.task.token_cleanup",
        interval_seconds = config.interval.as_secs(),
        retention_seconds = config.retention.as_secs(),
        "Starting token cleanup task"
    );

    let mut interval = tokio::time::interval(config.interval);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = run_cleanup(tokens.as_ref(), config.retention).await {
                    tracing::error!(
                        target: "devauth.task.token_cleanup",
                        error = %e,
                        "Failed to purge expired tokens"
                    );
                }
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "devauth.task.token_cleanup",
                    "Token cleanup task received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(
        target: "devauth.task.token_cleanup",
        "Token cleanup task stopped"
    );
}

/// Run a single purge, returning how many records were removed.
pub async fn run_cleanup(tokens: &dyn TokenStore, retention: Duration) -> Result<u64, DevAuthError> {
    let cutoff = chrono::Duration::from_std(retention)
        .ok()
        .and_then(|retention| Utc::now().checked_sub_signed(retention))
        .ok_or_else(|| {
            tracing::error!(
                target: "devauth.task.token_cleanup",
                retention_seconds = retention.as_secs(),
                "Retention period is out of range for a purge cutoff"
            );
            DevAuthError::Internal
        })?;

    let count = tokens.purge_expired(cutoff).await?;
    record_tokens_purged(count);

    if count > 0 {
        info!(
            target: "devauth.task.token_cleanup",
            purged_count = count,
            "Purged expired tokens"
        );
    }

    Ok(count)
}
