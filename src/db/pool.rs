//! Database connection pool abstraction
//!
//! One interface over the SQLite and MySQL backends. The pool is picked from
//! `database.driver` in the configuration.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use std::path::Path;
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

/// Borrowed handle to the concrete pool behind a `DatabasePool`
///
/// Repositories match on this to pick the SQL dialect.
#[derive(Clone, Copy)]
pub enum Backend<'a> {
    Sqlite(&'a SqlitePool),
    Mysql(&'a MySqlPool),
}

/// Connection pool shared by the repositories and migrations
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Run a statement that returns no rows
    async fn execute(&self, query: &str) -> Result<u64>;

    fn driver(&self) -> DatabaseDriver;

    /// Concrete pool for dialect-specific queries
    fn backend(&self) -> Backend<'_>;
}

/// Type alias for a boxed database pool
pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// SQLite pool with foreign keys enforced
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Open (creating if needed) the database at `url`
    pub async fn new(url: &str) -> Result<Self> {
        let connection_url = sqlite_url(url)?;

        let pool = SqlitePoolOptions::new()
            .max_connections(20)
            .connect(&connection_url)
            .await
            .with_context(|| format!("Failed to connect to SQLite database: {}", url))?;

        // Cascading deletes of recipes and users depend on this
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .context("Failed to enable foreign keys")?;

        Ok(Self { pool })
    }
}

/// Normalize a configured SQLite location into a sqlx URL.
///
/// File databases get `mode=rwc` and their parent directory is created.
fn sqlite_url(url: &str) -> Result<String> {
    if url == ":memory:" || url.starts_with("sqlite::memory:") {
        return Ok("sqlite::memory:".to_string());
    }

    let path = url.strip_prefix("sqlite:").unwrap_or(url);
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
    }

    Ok(match url.strip_prefix("sqlite:") {
        Some(_) if url.contains('?') => url.to_string(),
        Some(_) => format!("{}?mode=rwc", url),
        None => format!("sqlite:{}?mode=rwc", url),
    })
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn backend(&self) -> Backend<'_> {
        Backend::Sqlite(&self.pool)
    }
}

/// MySQL pool
pub struct MysqlDatabase {
    pool: MySqlPool,
}

impl MysqlDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let connection_url = if url.starts_with("mysql://") {
            url.to_string()
        } else {
            format!("mysql://{}", url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(30)
            .connect(&connection_url)
            .await
            .with_context(|| format!("Failed to connect to MySQL database: {}", url))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for MysqlDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn backend(&self) -> Backend<'_> {
        Backend::Mysql(&self.pool)
    }
}

/// Create a database connection pool based on configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    match config.driver {
        DatabaseDriver::Sqlite => Ok(Arc::new(SqliteDatabase::new(&config.url).await?)),
        DatabaseDriver::Mysql => Ok(Arc::new(MysqlDatabase::new(&config.url).await?)),
    }
}

/// Create a SQLite in-memory database pool for tests
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    create_pool(&DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite(pool: &DynDatabasePool) -> &SqlitePool {
        match pool.backend() {
            Backend::Sqlite(p) => p,
            Backend::Mysql(_) => panic!("expected sqlite backend"),
        }
    }

    #[test]
    fn test_sqlite_url() {
        assert_eq!(sqlite_url(":memory:").unwrap(), "sqlite::memory:");
        assert_eq!(sqlite_url("sqlite::memory:").unwrap(), "sqlite::memory:");
        assert_eq!(sqlite_url("foodgram.db").unwrap(), "sqlite:foodgram.db?mode=rwc");
        assert_eq!(sqlite_url("sqlite:foodgram.db").unwrap(), "sqlite:foodgram.db?mode=rwc");
        assert_eq!(sqlite_url("sqlite:foodgram.db?mode=ro").unwrap(), "sqlite:foodgram.db?mode=ro");
    }

    #[tokio::test]
    async fn test_create_test_pool() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(matches!(pool.backend(), Backend::Sqlite(_)));
    }

    #[tokio::test]
    async fn test_execute_reports_affected_rows() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        pool.execute("CREATE TABLE pantry (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .expect("Failed to create table");
        let affected = pool
            .execute("INSERT INTO pantry (name) VALUES ('flour'), ('sugar')")
            .await
            .expect("Failed to insert");
        assert_eq!(affected, 2);

        assert!(pool.execute("SELECT * FROM missing").await.is_err());
    }

    #[tokio::test]
    async fn test_file_database_in_nested_directory() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("nested").join("dir").join("foodgram.db");

        let pool = create_pool(&DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url: db_path.to_string_lossy().to_string(),
        })
        .await
        .expect("Failed to create pool");
        pool.execute("CREATE TABLE t (id INTEGER)").await.expect("Failed to write");

        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(sqlite(&pool))
            .await
            .expect("Failed to read pragma");
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    #[ignore = "Requires MySQL server"]
    async fn test_mysql_pool_creation() {
        let url = std::env::var("MYSQL_TEST_URL")
            .unwrap_or_else(|_| "mysql://root@localhost/test".to_string());

        let pool = create_pool(&DatabaseConfig {
            driver: DatabaseDriver::Mysql,
            url,
        })
        .await
        .expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Mysql);
        assert!(matches!(pool.backend(), Backend::Mysql(_)));
    }
}
