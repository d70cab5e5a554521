//! Ingredient repository

use crate::db::{Backend, DynDatabasePool};
use crate::models::{CreateIngredientInput, Ingredient};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::placeholders;

/// Ingredient repository trait
#[async_trait]
pub trait IngredientRepository: Send + Sync {
    /// Create a new ingredient
    async fn create(&self, input: &CreateIngredientInput) -> Result<Ingredient>;

    /// Get ingredient by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Ingredient>>;

    /// Get ingredient by its (name, measurement_unit) pair
    async fn get_by_name_and_unit(&self, name: &str, unit: &str) -> Result<Option<Ingredient>>;

    /// Get the ingredients among `ids` that exist
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Ingredient>>;

    /// List all ingredients ordered by name, then unit
    async fn list(&self) -> Result<Vec<Ingredient>>;
}

/// SQLx-based ingredient repository implementation
pub struct SqlxIngredientRepository {
    pool: DynDatabasePool,
}

impl SqlxIngredientRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn IngredientRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl IngredientRepository for SqlxIngredientRepository {
    async fn create(&self, input: &CreateIngredientInput) -> Result<Ingredient> {
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => create_ingredient_sqlite(pool, input).await?,
            Backend::Mysql(pool) => create_ingredient_mysql(pool, input).await?,
        };
        Ok(Ingredient {
            id,
            name: input.name.clone(),
            measurement_unit: input.measurement_unit.clone(),
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Ingredient>> {
        let sql = "SELECT id, name, measurement_unit FROM ingredients WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(sql).bind(id).fetch_optional(pool).await
                    .context("Failed to get ingredient by ID")?;
                Ok(row.as_ref().map(row_to_ingredient_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(sql).bind(id).fetch_optional(pool).await
                    .context("Failed to get ingredient by ID")?;
                Ok(row.as_ref().map(row_to_ingredient_mysql))
            }
        }
    }

    async fn get_by_name_and_unit(&self, name: &str, unit: &str) -> Result<Option<Ingredient>> {
        let sql = "SELECT id, name, measurement_unit FROM ingredients WHERE name = ? AND measurement_unit = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(sql).bind(name).bind(unit).fetch_optional(pool).await
                    .context("Failed to get ingredient by name")?;
                Ok(row.as_ref().map(row_to_ingredient_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(sql).bind(name).bind(unit).fetch_optional(pool).await
                    .context("Failed to get ingredient by name")?;
                Ok(row.as_ref().map(row_to_ingredient_mysql))
            }
        }
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Ingredient>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id, name, measurement_unit FROM ingredients WHERE id IN ({})",
            placeholders(ids.len())
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let mut query = sqlx::query(&sql);
                for id in ids {
                    query = query.bind(*id);
                }
                let rows = query.fetch_all(pool).await
                    .context("Failed to get ingredients by IDs")?;
                Ok(rows.iter().map(row_to_ingredient_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let mut query = sqlx::query(&sql);
                for id in ids {
                    query = query.bind(*id);
                }
                let rows = query.fetch_all(pool).await
                    .context("Failed to get ingredients by IDs")?;
                Ok(rows.iter().map(row_to_ingredient_mysql).collect())
            }
        }
    }

    async fn list(&self) -> Result<Vec<Ingredient>> {
        let sql = "SELECT id, name, measurement_unit FROM ingredients ORDER BY name, measurement_unit";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(sql).fetch_all(pool).await
                    .context("Failed to list ingredients")?;
                Ok(rows.iter().map(row_to_ingredient_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(sql).fetch_all(pool).await
                    .context("Failed to list ingredients")?;
                Ok(rows.iter().map(row_to_ingredient_mysql).collect())
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_ingredient_sqlite(pool: &SqlitePool, input: &CreateIngredientInput) -> Result<i64> {
    let result = sqlx::query("INSERT INTO ingredients (name, measurement_unit) VALUES (?, ?)")
        .bind(&input.name)
        .bind(&input.measurement_unit)
        .execute(pool)
        .await
        .context("Failed to create ingredient")?;

    Ok(result.last_insert_rowid())
}

fn row_to_ingredient_sqlite(row: &sqlx::sqlite::SqliteRow) -> Ingredient {
    Ingredient {
        id: row.get("id"),
        name: row.get("name"),
        measurement_unit: row.get("measurement_unit"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_ingredient_mysql(pool: &MySqlPool, input: &CreateIngredientInput) -> Result<i64> {
    let result = sqlx::query("INSERT INTO ingredients (name, measurement_unit) VALUES (?, ?)")
        .bind(&input.name)
        .bind(&input.measurement_unit)
        .execute(pool)
        .await
        .context("Failed to create ingredient")?;

    Ok(result.last_insert_id() as i64)
}

fn row_to_ingredient_mysql(row: &sqlx::mysql::MySqlRow) -> Ingredient {
    Ingredient {
        id: row.get("id"),
        name: row.get("name"),
        measurement_unit: row.get("measurement_unit"),
    }
}
