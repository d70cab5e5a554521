//! Tag repository
//!
//! Database operations for recipe tags.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{CreateTagInput, Tag};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::placeholders;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, input: &CreateTagInput) -> Result<Tag>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get tag by name
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// Get tag by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    /// Get the tags among `ids` that exist, ordered by name
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>>;

    /// List all tags ordered by name
    async fn list(&self) -> Result<Vec<Tag>>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, input: &CreateTagInput) -> Result<Tag> {
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => create_tag_sqlite(pool, input).await?,
            Backend::Mysql(pool) => create_tag_mysql(pool, input).await?,
        };
        Ok(Tag {
            id,
            name: input.name.clone(),
            slug: input.slug.clone(),
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        let sql = "SELECT id, name, slug FROM tags WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(sql).bind(id).fetch_optional(pool).await
                    .context("Failed to get tag by ID")?;
                Ok(row.as_ref().map(row_to_tag_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(sql).bind(id).fetch_optional(pool).await
                    .context("Failed to get tag by ID")?;
                Ok(row.as_ref().map(row_to_tag_mysql))
            }
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let sql = "SELECT id, name, slug FROM tags WHERE name = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(sql).bind(name).fetch_optional(pool).await
                    .context("Failed to get tag by name")?;
                Ok(row.as_ref().map(row_to_tag_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(sql).bind(name).fetch_optional(pool).await
                    .context("Failed to get tag by name")?;
                Ok(row.as_ref().map(row_to_tag_mysql))
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        let sql = "SELECT id, name, slug FROM tags WHERE slug = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(sql).bind(slug).fetch_optional(pool).await
                    .context("Failed to get tag by slug")?;
                Ok(row.as_ref().map(row_to_tag_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(sql).bind(slug).fetch_optional(pool).await
                    .context("Failed to get tag by slug")?;
                Ok(row.as_ref().map(row_to_tag_mysql))
            }
        }
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id, name, slug FROM tags WHERE id IN ({}) ORDER BY name",
            placeholders(ids.len())
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let mut query = sqlx::query(&sql);
                for id in ids {
                    query = query.bind(*id);
                }
                let rows = query.fetch_all(pool).await.context("Failed to get tags by IDs")?;
                Ok(rows.iter().map(row_to_tag_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let mut query = sqlx::query(&sql);
                for id in ids {
                    query = query.bind(*id);
                }
                let rows = query.fetch_all(pool).await.context("Failed to get tags by IDs")?;
                Ok(rows.iter().map(row_to_tag_mysql).collect())
            }
        }
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let sql = "SELECT id, name, slug FROM tags ORDER BY name, id";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(sql).fetch_all(pool).await.context("Failed to list tags")?;
                Ok(rows.iter().map(row_to_tag_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(sql).fetch_all(pool).await.context("Failed to list tags")?;
                Ok(rows.iter().map(row_to_tag_mysql).collect())
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tag_sqlite(pool: &SqlitePool, input: &CreateTagInput) -> Result<i64> {
    let result = sqlx::query("INSERT INTO tags (name, slug) VALUES (?, ?)")
        .bind(&input.name)
        .bind(&input.slug)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(result.last_insert_rowid())
}

pub(crate) fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_tag_mysql(pool: &MySqlPool, input: &CreateTagInput) -> Result<i64> {
    let result = sqlx::query("INSERT INTO tags (name, slug) VALUES (?, ?)")
        .bind(&input.name)
        .bind(&input.slug)
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(result.last_insert_id() as i64)
}

pub(crate) fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
    }
}
