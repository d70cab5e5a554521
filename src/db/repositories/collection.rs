//! Favorites and shopping cart repository
//!
//! Both collections are (user, recipe) sets with the same shape, so one
//! repository serves them, keyed by [`CollectionKind`]. The shopping cart
//! also owns the ingredient aggregation behind the downloadable list.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{CartRecipe, ShoppingListItem};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::fmt;
use std::sync::Arc;

/// Which per-user recipe set an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Favorites,
    ShoppingCart,
}

impl CollectionKind {
    fn table(self) -> &'static str {
        match self {
            CollectionKind::Favorites => "favorites",
            CollectionKind::ShoppingCart => "shopping_carts",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionKind::Favorites => write!(f, "favorites"),
            CollectionKind::ShoppingCart => write!(f, "shopping cart"),
        }
    }
}

/// Collection repository trait
#[async_trait]
pub trait CollectionRepository: Send + Sync {
    /// Add a recipe. Returns false if it was already there.
    async fn add(&self, kind: CollectionKind, user_id: i64, recipe_id: i64) -> Result<bool>;

    /// Remove a recipe. Returns false if it was not there.
    async fn remove(&self, kind: CollectionKind, user_id: i64, recipe_id: i64) -> Result<bool>;

    /// Check whether a recipe is in the user's collection
    async fn contains(&self, kind: CollectionKind, user_id: i64, recipe_id: i64) -> Result<bool>;

    /// Ingredient totals across the user's cart, grouped by name and unit
    async fn cart_items(&self, user_id: i64) -> Result<Vec<ShoppingListItem>>;

    /// Recipes in the user's cart with their authors, ordered by name
    async fn cart_recipes(&self, user_id: i64) -> Result<Vec<CartRecipe>>;
}

/// SQLx-based collection repository implementation
pub struct SqlxCollectionRepository {
    pool: DynDatabasePool,
}

impl SqlxCollectionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CollectionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CollectionRepository for SqlxCollectionRepository {
    async fn add(&self, kind: CollectionKind, user_id: i64, recipe_id: i64) -> Result<bool> {
        let now = Utc::now();
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let sql = format!(
                    "INSERT OR IGNORE INTO {} (user_id, recipe_id, created_at) VALUES (?, ?, ?)",
                    kind.table()
                );
                sqlx::query(&sql)
                    .bind(user_id)
                    .bind(recipe_id)
                    .bind(now)
                    .execute(pool)
                    .await
                    .map(|r| r.rows_affected())
            }
            Backend::Mysql(pool) => {
                let sql = format!(
                    "INSERT IGNORE INTO {} (user_id, recipe_id, created_at) VALUES (?, ?, ?)",
                    kind.table()
                );
                sqlx::query(&sql)
                    .bind(user_id)
                    .bind(recipe_id)
                    .bind(now)
                    .execute(pool)
                    .await
                    .map(|r| r.rows_affected())
            }
        }
        .with_context(|| format!("Failed to add recipe to {}", kind))?;

        Ok(affected > 0)
    }

    async fn remove(&self, kind: CollectionKind, user_id: i64, recipe_id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE user_id = ? AND recipe_id = ?", kind.table());
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql).bind(user_id).bind(recipe_id).execute(pool).await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(&sql).bind(user_id).bind(recipe_id).execute(pool).await
                .map(|r| r.rows_affected()),
        }
        .with_context(|| format!("Failed to remove recipe from {}", kind))?;

        Ok(affected > 0)
    }

    async fn contains(&self, kind: CollectionKind, user_id: i64, recipe_id: i64) -> Result<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE user_id = ? AND recipe_id = ?",
            kind.table()
        );
        let count = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query_scalar::<_, i64>(&sql).bind(user_id).bind(recipe_id)
                .fetch_one(pool).await,
            Backend::Mysql(pool) => sqlx::query_scalar::<_, i64>(&sql).bind(user_id).bind(recipe_id)
                .fetch_one(pool).await,
        }
        .with_context(|| format!("Failed to check {}", kind))?;

        Ok(count > 0)
    }

    async fn cart_items(&self, user_id: i64) -> Result<Vec<ShoppingListItem>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(
                    r#"
                    SELECT i.name, i.measurement_unit, SUM(ri.amount) AS amount
                    FROM shopping_carts c
                    JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
                    JOIN ingredients i ON i.id = ri.ingredient_id
                    WHERE c.user_id = ?
                    GROUP BY i.name, i.measurement_unit
                    ORDER BY i.name, i.measurement_unit
                    "#,
                )
                .bind(user_id)
                .fetch_all(pool)
                .await
                .context("Failed to aggregate shopping cart")?;

                Ok(rows
                    .iter()
                    .map(|row| ShoppingListItem {
                        name: row.get("name"),
                        measurement_unit: row.get("measurement_unit"),
                        amount: row.get("amount"),
                    })
                    .collect())
            }
            Backend::Mysql(pool) => {
                // SUM over INT yields DECIMAL on MySQL
                let rows = sqlx::query(
                    r#"
                    SELECT i.name, i.measurement_unit, CAST(SUM(ri.amount) AS SIGNED) AS amount
                    FROM shopping_carts c
                    JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
                    JOIN ingredients i ON i.id = ri.ingredient_id
                    WHERE c.user_id = ?
                    GROUP BY i.name, i.measurement_unit
                    ORDER BY i.name, i.measurement_unit
                    "#,
                )
                .bind(user_id)
                .fetch_all(pool)
                .await
                .context("Failed to aggregate shopping cart")?;

                Ok(rows
                    .iter()
                    .map(|row| ShoppingListItem {
                        name: row.get("name"),
                        measurement_unit: row.get("measurement_unit"),
                        amount: row.get("amount"),
                    })
                    .collect())
            }
        }
    }

    async fn cart_recipes(&self, user_id: i64) -> Result<Vec<CartRecipe>> {
        let sql = r#"
            SELECT r.id, r.name, u.username
            FROM shopping_carts c
            JOIN recipes r ON r.id = c.recipe_id
            JOIN users u ON u.id = r.author_id
            WHERE c.user_id = ?
            ORDER BY r.name, r.id
        "#;
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(sql).bind(user_id).fetch_all(pool).await
                    .context("Failed to list cart recipes")?;
                Ok(rows
                    .iter()
                    .map(|row| CartRecipe {
                        id: row.get("id"),
                        name: row.get("name"),
                        author_username: row.get("username"),
                    })
                    .collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(sql).bind(user_id).fetch_all(pool).await
                    .context("Failed to list cart recipes")?;
                Ok(rows
                    .iter()
                    .map(|row| CartRecipe {
                        id: row.get("id"),
                        name: row.get("name"),
                        author_username: row.get("username"),
                    })
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::recipe::tests::{fixture, recipe_input};
    use crate::db::repositories::RecipeRepository;

    #[tokio::test]
    async fn test_add_remove_contains() {
        let f = fixture().await;
        let recipe = f
            .repo
            .create(f.author, &recipe_input("Omelette", vec![f.tags[0].id], vec![(f.ingredients[0], 3)]))
            .await
            .unwrap();
        let repo = SqlxCollectionRepository::new(f.pool.clone());

        for kind in [CollectionKind::Favorites, CollectionKind::ShoppingCart] {
            assert!(!repo.contains(kind, f.reader, recipe.id).await.unwrap());
            assert!(repo.add(kind, f.reader, recipe.id).await.unwrap());
            assert!(!repo.add(kind, f.reader, recipe.id).await.unwrap());
            assert!(repo.contains(kind, f.reader, recipe.id).await.unwrap());
            assert!(repo.remove(kind, f.reader, recipe.id).await.unwrap());
            assert!(!repo.remove(kind, f.reader, recipe.id).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_collections_are_independent() {
        let f = fixture().await;
        let recipe = f
            .repo
            .create(f.author, &recipe_input("Porridge", vec![f.tags[0].id], vec![(f.ingredients[2], 200)]))
            .await
            .unwrap();
        let repo = SqlxCollectionRepository::new(f.pool.clone());

        repo.add(CollectionKind::Favorites, f.reader, recipe.id).await.unwrap();
        assert!(!repo.contains(CollectionKind::ShoppingCart, f.reader, recipe.id).await.unwrap());
        assert!(!repo.contains(CollectionKind::Favorites, f.author, recipe.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_cart_aggregation_sums_and_sorts() {
        let f = fixture().await;
        let (egg, flour, milk) = (f.ingredients[0], f.ingredients[1], f.ingredients[2]);
        let pancakes = f
            .repo
            .create(f.author, &recipe_input("Pancakes", vec![f.tags[0].id], vec![(milk, 300), (egg, 2), (flour, 150)]))
            .await
            .unwrap();
        let omelette = f
            .repo
            .create(f.author, &recipe_input("Omelette", vec![f.tags[0].id], vec![(egg, 3), (milk, 50)]))
            .await
            .unwrap();
        let ignored = f
            .repo
            .create(f.author, &recipe_input("Bread", vec![f.tags[0].id], vec![(flour, 500)]))
            .await
            .unwrap();

        let repo = SqlxCollectionRepository::new(f.pool.clone());
        repo.add(CollectionKind::ShoppingCart, f.reader, pancakes.id).await.unwrap();
        repo.add(CollectionKind::ShoppingCart, f.reader, omelette.id).await.unwrap();
        repo.add(CollectionKind::Favorites, f.reader, ignored.id).await.unwrap();

        let items = repo.cart_items(f.reader).await.unwrap();
        let summary: Vec<(&str, i64)> = items.iter().map(|i| (i.name.as_str(), i.amount)).collect();
        assert_eq!(summary, vec![("egg", 5), ("flour", 150), ("milk", 350)]);
        assert_eq!(items[2].measurement_unit, "ml");

        let recipes = repo.cart_recipes(f.reader).await.unwrap();
        let names: Vec<&str> = recipes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Omelette", "Pancakes"]);
        assert_eq!(recipes[0].author_username, "author");
    }

    #[tokio::test]
    async fn test_empty_cart() {
        let f = fixture().await;
        let repo = SqlxCollectionRepository::new(f.pool.clone());
        assert!(repo.cart_items(f.reader).await.unwrap().is_empty());
        assert!(repo.cart_recipes(f.reader).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recipe_delete_cascades_to_collections() {
        let f = fixture().await;
        let recipe = f
            .repo
            .create(f.author, &recipe_input("Toast", vec![f.tags[0].id], vec![(f.ingredients[1], 50)]))
            .await
            .unwrap();
        let repo = SqlxCollectionRepository::new(f.pool.clone());
        repo.add(CollectionKind::ShoppingCart, f.reader, recipe.id).await.unwrap();

        f.repo.delete(recipe.id).await.unwrap();
        assert!(repo.cart_items(f.reader).await.unwrap().is_empty());
        assert!(!repo.contains(CollectionKind::ShoppingCart, f.reader, recipe.id).await.unwrap());
    }
}
