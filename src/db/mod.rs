//! Database layer
//!
//! SQLite is the default backend; MySQL is selected with `database.driver: mysql`.
//! Both sit behind the `DatabasePool` trait, and repositories pick the SQL
//! dialect through `DatabasePool::backend`.
//!
//! # Usage
//!
//! ```ignore
//! use foodgram::config::DatabaseConfig;
//! use foodgram::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, Backend, DatabasePool, DynDatabasePool, MysqlDatabase,
    SqliteDatabase,
};
