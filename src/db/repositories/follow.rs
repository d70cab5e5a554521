//! Follow (subscription) repository

use crate::db::{Backend, DynDatabasePool};
use crate::models::{ListParams, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::user::{row_to_user_mysql, row_to_user_sqlite};

const AUTHOR_COLUMNS: &str = "u.id, u.email, u.username, u.first_name, u.last_name, \
    u.password_hash, u.avatar, u.role, u.created_at, u.updated_at";

/// Follow repository trait
#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Subscribe `user_id` to `author_id`. Returns false if already subscribed.
    async fn follow(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Remove a subscription. Returns false if there was none.
    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Check whether `user_id` follows `author_id`
    async fn exists(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Authors followed by a user, ordered by author ID
    async fn list_authors(&self, user_id: i64, params: &ListParams) -> Result<Vec<User>>;

    /// Number of authors followed by a user
    async fn count_authors(&self, user_id: i64) -> Result<i64>;
}

/// SQLx-based follow repository implementation
pub struct SqlxFollowRepository {
    pool: DynDatabasePool,
}

impl SqlxFollowRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FollowRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FollowRepository for SqlxFollowRepository {
    async fn follow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let now = Utc::now();
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(
                "INSERT OR IGNORE INTO follows (user_id, author_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(user_id)
            .bind(author_id)
            .bind(now)
            .execute(pool)
            .await
            .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(
                "INSERT IGNORE INTO follows (user_id, author_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(user_id)
            .bind(author_id)
            .bind(now)
            .execute(pool)
            .await
            .map(|r| r.rows_affected()),
        }
        .context("Failed to create follow")?;

        Ok(affected > 0)
    }

    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let sql = "DELETE FROM follows WHERE user_id = ? AND author_id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql).bind(user_id).bind(author_id).execute(pool).await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(sql).bind(user_id).bind(author_id).execute(pool).await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete follow")?;

        Ok(affected > 0)
    }

    async fn exists(&self, user_id: i64, author_id: i64) -> Result<bool> {
        let sql = "SELECT COUNT(*) FROM follows WHERE user_id = ? AND author_id = ?";
        let count = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query_scalar::<_, i64>(sql).bind(user_id).bind(author_id)
                .fetch_one(pool).await,
            Backend::Mysql(pool) => sqlx::query_scalar::<_, i64>(sql).bind(user_id).bind(author_id)
                .fetch_one(pool).await,
        }
        .context("Failed to check follow")?;

        Ok(count > 0)
    }

    async fn list_authors(&self, user_id: i64, params: &ListParams) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM follows f JOIN users u ON u.id = f.author_id \
             WHERE f.user_id = ? ORDER BY u.id LIMIT ? OFFSET ?",
            AUTHOR_COLUMNS
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(user_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list followed authors")?;
                rows.iter().map(row_to_user_sqlite).collect()
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(user_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list followed authors")?;
                rows.iter().map(row_to_user_mysql).collect()
            }
        }
    }

    async fn count_authors(&self, user_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) FROM follows WHERE user_id = ?";
        let count = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query_scalar::<_, i64>(sql).bind(user_id).fetch_one(pool).await,
            Backend::Mysql(pool) => sqlx::query_scalar::<_, i64>(sql).bind(user_id).fetch_one(pool).await,
        }
        .context("Failed to count followed authors")?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreateUserInput, UserRole};

    async fn setup() -> (SqlxFollowRepository, Vec<i64>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let mut ids = Vec::new();
        for name in ["reader", "alice", "bob", "carol"] {
            let user = users
                .create(&CreateUserInput {
                    email: format!("{}@example.com", name),
                    username: name.to_string(),
                    first_name: "F".to_string(),
                    last_name: "L".to_string(),
                    password_hash: "hash".to_string(),
                    role: UserRole::User,
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        (SqlxFollowRepository::new(pool), ids)
    }

    #[tokio::test]
    async fn test_follow_and_unfollow() {
        let (repo, ids) = setup().await;
        let (reader, alice) = (ids[0], ids[1]);

        assert!(repo.follow(reader, alice).await.unwrap());
        assert!(!repo.follow(reader, alice).await.unwrap());
        assert!(repo.exists(reader, alice).await.unwrap());
        assert!(!repo.exists(alice, reader).await.unwrap());

        assert!(repo.unfollow(reader, alice).await.unwrap());
        assert!(!repo.unfollow(reader, alice).await.unwrap());
        assert!(!repo.exists(reader, alice).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_authors_ordered_and_paginated() {
        let (repo, ids) = setup().await;
        let reader = ids[0];
        for author in [ids[3], ids[1], ids[2]] {
            repo.follow(reader, author).await.unwrap();
        }

        assert_eq!(repo.count_authors(reader).await.unwrap(), 3);

        let page = repo.list_authors(reader, &ListParams::new(2, 0)).await.unwrap();
        let names: Vec<&str> = page.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);

        let rest = repo.list_authors(reader, &ListParams::new(2, 2)).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].username, "carol");
    }
}
