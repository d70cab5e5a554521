//! Short link repository

use crate::db::{Backend, DynDatabasePool};
use crate::models::ShortLink;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Short link repository trait
#[async_trait]
pub trait ShortLinkRepository: Send + Sync {
    /// Get the link of a recipe
    async fn get_by_recipe(&self, recipe_id: i64) -> Result<Option<ShortLink>>;

    /// Get a link by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<ShortLink>>;

    /// Store a link. Fails if the slug or the recipe already has one.
    async fn create(&self, slug: &str, recipe_id: i64) -> Result<ShortLink>;
}

/// SQLx-based short link repository implementation
pub struct SqlxShortLinkRepository {
    pool: DynDatabasePool,
}

impl SqlxShortLinkRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ShortLinkRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_one(&self, sql: &str, key: ShortLinkKey<'_>) -> Result<Option<ShortLink>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let query = sqlx::query(sql);
                let query = match key {
                    ShortLinkKey::Slug(slug) => query.bind(slug),
                    ShortLinkKey::Recipe(id) => query.bind(id),
                };
                let row = query.fetch_optional(pool).await.context("Failed to get short link")?;
                Ok(row.map(|row| ShortLink {
                    slug: row.get("slug"),
                    recipe_id: row.get("recipe_id"),
                    created_at: row.get("created_at"),
                }))
            }
            Backend::Mysql(pool) => {
                let query = sqlx::query(sql);
                let query = match key {
                    ShortLinkKey::Slug(slug) => query.bind(slug),
                    ShortLinkKey::Recipe(id) => query.bind(id),
                };
                let row = query.fetch_optional(pool).await.context("Failed to get short link")?;
                Ok(row.map(|row| ShortLink {
                    slug: row.get("slug"),
                    recipe_id: row.get("recipe_id"),
                    created_at: row.get("created_at"),
                }))
            }
        }
    }
}

#[derive(Clone, Copy)]
enum ShortLinkKey<'a> {
    Slug(&'a str),
    Recipe(i64),
}

#[async_trait]
impl ShortLinkRepository for SqlxShortLinkRepository {
    async fn get_by_recipe(&self, recipe_id: i64) -> Result<Option<ShortLink>> {
        self.fetch_one(
            "SELECT slug, recipe_id, created_at FROM short_links WHERE recipe_id = ?",
            ShortLinkKey::Recipe(recipe_id),
        )
        .await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<ShortLink>> {
        self.fetch_one(
            "SELECT slug, recipe_id, created_at FROM short_links WHERE slug = ?",
            ShortLinkKey::Slug(slug),
        )
        .await
    }

    async fn create(&self, slug: &str, recipe_id: i64) -> Result<ShortLink> {
        let sql = "INSERT INTO short_links (slug, recipe_id, created_at) VALUES (?, ?, ?)";
        let now = Utc::now();
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql).bind(slug).bind(recipe_id).bind(now).execute(pool).await
                .map(|_| ()),
            Backend::Mysql(pool) => sqlx::query(sql).bind(slug).bind(recipe_id).bind(now).execute(pool).await
                .map(|_| ()),
        }
        .context("Failed to create short link")?;

        Ok(ShortLink {
            slug: slug.to_string(),
            recipe_id,
            created_at: now,
        })
    }
}
