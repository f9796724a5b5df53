//! PostgreSQL token store.
//!
//! Revocation is a tombstone (`revoked = true`); explicit deletion and the
//! expiry purge remove rows.

use crate::errors::DevAuthError;
use crate::models::Token;
use crate::observability::metrics::record_db_query;
use crate::repositories::TokenStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Instant;

#[derive(Debug, sqlx::FromRow)]
struct TokenRow {
    jti: String,
    device_id: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

impl From<TokenRow> for Token {
    fn from(row: TokenRow) -> Self {
        Token {
            jti: row.jti,
            device_id: row.device_id,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            revoked: row.revoked,
        }
    }
}

/// Token store backed by the `tokens` table.
#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn create(&self, token: &Token) -> Result<(), DevAuthError> {
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            INSERT INTO tokens (jti, device_id, issued_at, expires_at, revoked)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&token.jti)
        .bind(&token.device_id)
        .bind(token.issued_at)
        .bind(token.expires_at)
        .bind(token.revoked)
        .execute(&self.pool)
        .await;
        let status = if result.is_ok() { "success" } else { "error" };
        record_db_query("insert", "tokens", status, start.elapsed());

        result.map_err(|e| DevAuthError::Database(format!("Failed to create token: {}", e)))?;
        Ok(())
    }

    async fn get(&self, jti: &str) -> Result<Option<Token>, DevAuthError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT jti, device_id, issued_at, expires_at, revoked
            FROM tokens
            WHERE jti = $1
            "#,
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await;
        let status = if result.is_ok() { "success" } else { "error" };
        record_db_query("select", "tokens", status, start.elapsed());

        let row =
            result.map_err(|e| DevAuthError::Database(format!("Failed to fetch token: {}", e)))?;
        Ok(row.map(Token::from))
    }

    async fn revoke(&self, jti: &str) -> Result<bool, DevAuthError> {
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            UPDATE tokens
            SET revoked = true
            WHERE jti = $1
            "#,
        )
        .bind(jti)
        .execute(&self.pool)
        .await;
        let status = if result.is_ok() { "success" } else { "error" };
        record_db_query("update", "tokens", status, start.elapsed());

        let result =
            result.map_err(|e| DevAuthError::Database(format!("Failed to revoke token: {}", e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, jti: &str) -> Result<bool, DevAuthError> {
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            DELETE FROM tokens
            WHERE jti = $1
            "#,
        )
        .bind(jti)
        .execute(&self.pool)
        .await;
        let status = if result.is_ok() { "success" } else { "error" };
        record_db_query("delete", "tokens", status, start.elapsed());

        let result =
            result.map_err(|e| DevAuthError::Database(format!("Failed to delete token: {}", e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for_device(&self, device_id: &str) -> Result<u64, DevAuthError> {
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            UPDATE tokens
            SET revoked = true
            WHERE device_id = $1 AND revoked = false
            "#,
        )
        .bind(device_id)
        .execute(&self.pool)
        .await;
        let status = if result.is_ok() { "success" } else { "error" };
        record_db_query("update", "tokens", status, start.elapsed());

        let result = result.map_err(|e| {
            DevAuthError::Database(format!("Failed to revoke device tokens: {}", e))
        })?;
        Ok(result.rows_affected())
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, DevAuthError> {
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            DELETE FROM tokens
            WHERE expires_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await;
        let status = if result.is_ok() { "success" } else { "error" };
        record_db_query("delete", "tokens", status, start.elapsed());

        let result = result.map_err(|e| {
            DevAuthError::Database(format!("Failed to purge expired tokens: {}", e))
        })?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), DevAuthError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DevAuthError::Database(format!("Token store unreachable: {}", e)))?;
        Ok(())
    }
}
