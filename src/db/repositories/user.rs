//! User repository
//!
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::db::{Backend, DynDatabasePool};
use crate::models::{CreateUserInput, ListParams, User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

const USER_COLUMNS: &str =
    "id, email, username, first_name, last_name, password_hash, avatar, role, created_at, updated_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, input: &CreateUserInput) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// List users ordered by id
    async fn list(&self, params: &ListParams) -> Result<Vec<User>>;

    /// Count total users
    async fn count(&self) -> Result<i64>;

    /// Replace the password hash
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()>;

    /// Set or clear the avatar
    async fn update_avatar(&self, id: i64, avatar: Option<&str>) -> Result<()>;

    /// Change the role of a user
    async fn update_role(&self, id: i64, role: UserRole) -> Result<()>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, input: &CreateUserInput) -> Result<User> {
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => create_user_sqlite(pool, input).await?,
            Backend::Mysql(pool) => create_user_mysql(pool, input).await?,
        };
        self.get_by_id(id)
            .await?
            .with_context(|| format!("User {} missing after insert", id))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        match self.pool.backend() {
            Backend::Sqlite(pool) => fetch_user_sqlite(pool, &sql, id).await,
            Backend::Mysql(pool) => fetch_user_mysql(pool, &sql, id).await,
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER(?)", USER_COLUMNS);
        match self.pool.backend() {
            Backend::Sqlite(pool) => fetch_user_sqlite(pool, &sql, email).await,
            Backend::Mysql(pool) => fetch_user_mysql(pool, &sql, email).await,
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
        match self.pool.backend() {
            Backend::Sqlite(pool) => fetch_user_sqlite(pool, &sql, username).await,
            Backend::Mysql(pool) => fetch_user_mysql(pool, &sql, username).await,
        }
    }

    async fn list(&self, params: &ListParams) -> Result<Vec<User>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_users_sqlite(pool, params).await,
            Backend::Mysql(pool) => list_users_mysql(pool, params).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                .fetch_one(pool)
                .await,
            Backend::Mysql(pool) => sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                .fetch_one(pool)
                .await,
        }
        .context("Failed to count users")?;
        Ok(count)
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        let sql = "UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(password_hash)
                .bind(Utc::now())
                .bind(id)
                .execute(pool)
                .await
                .map(|_| ()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(password_hash)
                .bind(Utc::now())
                .bind(id)
                .execute(pool)
                .await
                .map(|_| ()),
        }
        .context("Failed to update password")
    }

    async fn update_avatar(&self, id: i64, avatar: Option<&str>) -> Result<()> {
        let sql = "UPDATE users SET avatar = ?, updated_at = ? WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(avatar)
                .bind(Utc::now())
                .bind(id)
                .execute(pool)
                .await
                .map(|_| ()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(avatar)
                .bind(Utc::now())
                .bind(id)
                .execute(pool)
                .await
                .map(|_| ()),
        }
        .context("Failed to update avatar")
    }

    async fn update_role(&self, id: i64, role: UserRole) -> Result<()> {
        let sql = "UPDATE users SET role = ?, updated_at = ? WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(role.to_string())
                .bind(Utc::now())
                .bind(id)
                .execute(pool)
                .await
                .map(|_| ()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(role.to_string())
                .bind(Utc::now())
                .bind(id)
                .execute(pool)
                .await
                .map(|_| ()),
        }
        .context("Failed to update role")
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, input: &CreateUserInput) -> Result<i64> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO users (email, username, first_name, last_name, password_hash, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.email)
    .bind(&input.username)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.password_hash)
    .bind(input.role.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(result.last_insert_rowid())
}

async fn fetch_user_sqlite<'q, T>(pool: &SqlitePool, sql: &'q str, key: T) -> Result<Option<User>>
where
    T: 'q + Send + sqlx::Encode<'q, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    let row = sqlx::query(sql)
        .bind(key)
        .fetch_optional(pool)
        .await
        .context("Failed to get user")?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn list_users_sqlite(pool: &SqlitePool, params: &ListParams) -> Result<Vec<User>> {
    let sql = format!("SELECT {} FROM users ORDER BY id LIMIT ? OFFSET ?", USER_COLUMNS);
    let rows = sqlx::query(&sql)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;

    rows.iter().map(row_to_user_sqlite).collect()
}

pub(crate) fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid user role in database: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        avatar: row.get("avatar"),
        role,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, input: &CreateUserInput) -> Result<i64> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO users (email, username, first_name, last_name, password_hash, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.email)
    .bind(&input.username)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.password_hash)
    .bind(input.role.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(result.last_insert_id() as i64)
}

async fn fetch_user_mysql<'q, T>(pool: &MySqlPool, sql: &'q str, key: T) -> Result<Option<User>>
where
    T: 'q + Send + sqlx::Encode<'q, sqlx::MySql> + sqlx::Type<sqlx::MySql>,
{
    let row = sqlx::query(sql)
        .bind(key)
        .fetch_optional(pool)
        .await
        .context("Failed to get user")?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn list_users_mysql(pool: &MySqlPool, params: &ListParams) -> Result<Vec<User>> {
    let sql = format!("SELECT {} FROM users ORDER BY id LIMIT ? OFFSET ?", USER_COLUMNS);
    let rows = sqlx::query(&sql)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;

    rows.iter().map(row_to_user_mysql).collect()
}

pub(crate) fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid user role in database: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        avatar: row.get("avatar"),
        role,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
