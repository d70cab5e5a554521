//! Auth token repository
//!
//! Database operations for API tokens issued at login.

use crate::db::{Backend, DynDatabasePool};
use crate::models::AuthToken;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Token repository trait
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Store a new token
    async fn create(&self, token: &AuthToken) -> Result<AuthToken>;

    /// Get a token by its value
    async fn get(&self, token: &str) -> Result<Option<AuthToken>>;

    /// Delete a token
    async fn delete(&self, token: &str) -> Result<()>;

    /// Delete all tokens of a user
    async fn delete_by_user(&self, user_id: i64) -> Result<()>;

    /// Delete expired tokens, returning how many were removed
    async fn delete_expired(&self) -> Result<i64>;
}

/// SQLx-based token repository implementation
pub struct SqlxTokenRepository {
    pool: DynDatabasePool,
}

impl SqlxTokenRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TokenRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TokenRepository for SqlxTokenRepository {
    async fn create(&self, token: &AuthToken) -> Result<AuthToken> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_token_sqlite(pool, token).await?,
            Backend::Mysql(pool) => create_token_mysql(pool, token).await?,
        }
        Ok(token.clone())
    }

    async fn get(&self, token: &str) -> Result<Option<AuthToken>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_token_sqlite(pool, token).await,
            Backend::Mysql(pool) => get_token_mysql(pool, token).await,
        }
    }

    async fn delete(&self, token: &str) -> Result<()> {
        let sql = "DELETE FROM auth_tokens WHERE token = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql).bind(token).execute(pool).await.map(|_| ()),
            Backend::Mysql(pool) => sqlx::query(sql).bind(token).execute(pool).await.map(|_| ()),
        }
        .context("Failed to delete token")
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<()> {
        let sql = "DELETE FROM auth_tokens WHERE user_id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql).bind(user_id).execute(pool).await.map(|_| ()),
            Backend::Mysql(pool) => sqlx::query(sql).bind(user_id).execute(pool).await.map(|_| ()),
        }
        .context("Failed to delete tokens by user")
    }

    async fn delete_expired(&self) -> Result<i64> {
        let sql = "DELETE FROM auth_tokens WHERE expires_at < ?";
        let now = Utc::now();
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(now)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(now)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete expired tokens")?;

        Ok(affected as i64)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_token_sqlite(pool: &SqlitePool, token: &AuthToken) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO auth_tokens (token, user_id, expires_at, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&token.token)
    .bind(token.user_id)
    .bind(token.expires_at)
    .bind(token.created_at)
    .execute(pool)
    .await
    .context("Failed to create token")?;

    Ok(())
}

async fn get_token_sqlite(pool: &SqlitePool, token: &str) -> Result<Option<AuthToken>> {
    let row = sqlx::query(
        r#"
        SELECT token, user_id, expires_at, created_at
        FROM auth_tokens
        WHERE token = ?
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await
    .context("Failed to get token")?;

    Ok(row.map(|row| AuthToken {
        token: row.get("token"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }))
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_token_mysql(pool: &MySqlPool, token: &AuthToken) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO auth_tokens (token, user_id, expires_at, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&token.token)
    .bind(token.user_id)
    .bind(token.expires_at)
    .bind(token.created_at)
    .execute(pool)
    .await
    .context("Failed to create token")?;

    Ok(())
}

async fn get_token_mysql(pool: &MySqlPool, token: &str) -> Result<Option<AuthToken>> {
    let row = sqlx::query(
        r#"
        SELECT token, user_id, expires_at, created_at
        FROM auth_tokens
        WHERE token = ?
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await
    .context("Failed to get token")?;

    Ok(row.map(|row| AuthToken {
        token: row.get("token"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }))
}
