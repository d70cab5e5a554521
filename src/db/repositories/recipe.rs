//! Recipe repository
//!
//! Recipes are written together with their tag links and ingredient lines,
//! so create and update run in one transaction.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{
    CreateRecipeInput, IngredientAmount, ListParams, Recipe, RecipeFilter, RecipeIngredient, Tag,
    UpdateRecipeInput,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySql, MySqlPool, Row, Sqlite, SqlitePool, Transaction};
use std::sync::Arc;

use super::tag::{row_to_tag_mysql, row_to_tag_sqlite};
use super::{placeholders, SqlArg};

const RECIPE_COLUMNS: &str = "r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.pub_date";

/// Recipe repository trait
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Create a recipe with its tags and ingredients
    async fn create(&self, author_id: i64, input: &CreateRecipeInput) -> Result<Recipe>;

    /// Update a recipe. `None` fields keep their value; `Some` tag and
    /// ingredient lists replace the stored ones. Returns `None` if the
    /// recipe does not exist.
    async fn update(&self, id: i64, input: &UpdateRecipeInput) -> Result<Option<Recipe>>;

    /// Delete a recipe; related rows go with it. Returns false if missing.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Get recipe by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>>;

    /// List recipes matching the filter, newest first
    async fn list(&self, filter: &RecipeFilter, params: &ListParams) -> Result<Vec<Recipe>>;

    /// Count recipes matching the filter
    async fn count(&self, filter: &RecipeFilter) -> Result<i64>;

    /// Newest recipes of an author, at most `limit` when given
    async fn list_by_author(&self, author_id: i64, limit: Option<i64>) -> Result<Vec<Recipe>>;

    /// Number of recipes by an author
    async fn count_by_author(&self, author_id: i64) -> Result<i64>;

    /// Tags of a recipe, ordered by name
    async fn tags_for(&self, recipe_id: i64) -> Result<Vec<Tag>>;

    /// Ingredient lines of a recipe, in insertion order
    async fn ingredients_for(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>>;
}

/// SQLx-based recipe repository implementation
pub struct SqlxRecipeRepository {
    pool: DynDatabasePool,
}

impl SqlxRecipeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RecipeRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Build the WHERE clause for a recipe filter. The recipe table is aliased `r`.
fn filter_clause(filter: &RecipeFilter) -> (String, Vec<SqlArg>) {
    let mut clauses = Vec::new();
    let mut args = Vec::new();

    if let Some(author) = filter.author {
        clauses.push("r.author_id = ?".to_string());
        args.push(SqlArg::Int(author));
    }
    if !filter.tags.is_empty() {
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id \
             WHERE rt.recipe_id = r.id AND t.slug IN ({}))",
            placeholders(filter.tags.len())
        ));
        args.extend(filter.tags.iter().cloned().map(SqlArg::Text));
    }
    if let Some(user_id) = filter.favorited_by {
        clauses.push(
            "EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ?)".to_string(),
        );
        args.push(SqlArg::Int(user_id));
    }
    if let Some(user_id) = filter.in_cart_of {
        clauses.push(
            "EXISTS (SELECT 1 FROM shopping_carts c WHERE c.recipe_id = r.id AND c.user_id = ?)"
                .to_string(),
        );
        args.push(SqlArg::Int(user_id));
    }

    if clauses.is_empty() {
        (String::new(), args)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), args)
    }
}

#[async_trait]
impl RecipeRepository for SqlxRecipeRepository {
    async fn create(&self, author_id: i64, input: &CreateRecipeInput) -> Result<Recipe> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_recipe_sqlite(pool, author_id, input).await,
            Backend::Mysql(pool) => create_recipe_mysql(pool, author_id, input).await,
        }
    }

    async fn update(&self, id: i64, input: &UpdateRecipeInput) -> Result<Option<Recipe>> {
        let updated = match self.pool.backend() {
            Backend::Sqlite(pool) => update_recipe_sqlite(pool, id, input).await?,
            Backend::Mysql(pool) => update_recipe_mysql(pool, id, input).await?,
        };
        if !updated {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM recipes WHERE id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql).bind(id).execute(pool).await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(sql).bind(id).execute(pool).await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete recipe")?;
        Ok(affected > 0)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>> {
        let sql = format!("SELECT {} FROM recipes r WHERE r.id = ?", RECIPE_COLUMNS);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await
                    .context("Failed to get recipe by ID")?;
                Ok(row.as_ref().map(row_to_recipe_sqlite))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await
                    .context("Failed to get recipe by ID")?;
                Ok(row.as_ref().map(row_to_recipe_mysql))
            }
        }
    }

    async fn list(&self, filter: &RecipeFilter, params: &ListParams) -> Result<Vec<Recipe>> {
        let (where_clause, args) = filter_clause(filter);
        let sql = format!(
            "SELECT {} FROM recipes r {} ORDER BY r.pub_date DESC, r.id DESC LIMIT ? OFFSET ?",
            RECIPE_COLUMNS, where_clause
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let mut query = sqlx::query(&sql);
                for arg in &args {
                    query = arg.bind_sqlite(query);
                }
                let rows = query
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list recipes")?;
                Ok(rows.iter().map(row_to_recipe_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let mut query = sqlx::query(&sql);
                for arg in &args {
                    query = arg.bind_mysql(query);
                }
                let rows = query
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list recipes")?;
                Ok(rows.iter().map(row_to_recipe_mysql).collect())
            }
        }
    }

    async fn count(&self, filter: &RecipeFilter) -> Result<i64> {
        let (where_clause, args) = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM recipes r {}", where_clause);
        let count = match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let mut query = sqlx::query_scalar::<_, i64>(&sql);
                for arg in &args {
                    query = match arg {
                        SqlArg::Int(v) => query.bind(*v),
                        SqlArg::Text(v) => query.bind(v.as_str()),
                    };
                }
                query.fetch_one(pool).await
            }
            Backend::Mysql(pool) => {
                let mut query = sqlx::query_scalar::<_, i64>(&sql);
                for arg in &args {
                    query = match arg {
                        SqlArg::Int(v) => query.bind(*v),
                        SqlArg::Text(v) => query.bind(v.as_str()),
                    };
                }
                query.fetch_one(pool).await
            }
        }
        .context("Failed to count recipes")?;
        Ok(count)
    }

    async fn list_by_author(&self, author_id: i64, limit: Option<i64>) -> Result<Vec<Recipe>> {
        let sql = format!(
            "SELECT {} FROM recipes r WHERE r.author_id = ? ORDER BY r.pub_date DESC, r.id DESC LIMIT ?",
            RECIPE_COLUMNS
        );
        let limit = limit.unwrap_or(i64::MAX).max(0);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql).bind(author_id).bind(limit).fetch_all(pool).await
                    .context("Failed to list recipes by author")?;
                Ok(rows.iter().map(row_to_recipe_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql).bind(author_id).bind(limit).fetch_all(pool).await
                    .context("Failed to list recipes by author")?;
                Ok(rows.iter().map(row_to_recipe_mysql).collect())
            }
        }
    }

    async fn count_by_author(&self, author_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) FROM recipes WHERE author_id = ?";
        let count = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query_scalar::<_, i64>(sql).bind(author_id).fetch_one(pool).await,
            Backend::Mysql(pool) => sqlx::query_scalar::<_, i64>(sql).bind(author_id).fetch_one(pool).await,
        }
        .context("Failed to count recipes by author")?;
        Ok(count)
    }

    async fn tags_for(&self, recipe_id: i64) -> Result<Vec<Tag>> {
        let sql = r#"
            SELECT t.id, t.name, t.slug
            FROM recipe_tags rt
            JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = ?
            ORDER BY t.name
        "#;
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(sql).bind(recipe_id).fetch_all(pool).await
                    .context("Failed to get recipe tags")?;
                Ok(rows.iter().map(row_to_tag_sqlite).collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(sql).bind(recipe_id).fetch_all(pool).await
                    .context("Failed to get recipe tags")?;
                Ok(rows.iter().map(row_to_tag_mysql).collect())
            }
        }
    }

    async fn ingredients_for(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>> {
        let sql = r#"
            SELECT i.id, i.name, i.measurement_unit, ri.amount
            FROM recipe_ingredients ri
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ?
            ORDER BY ri.id
        "#;
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(sql).bind(recipe_id).fetch_all(pool).await
                    .context("Failed to get recipe ingredients")?;
                Ok(rows
                    .iter()
                    .map(|row| RecipeIngredient {
                        id: row.get("id"),
                        name: row.get("name"),
                        measurement_unit: row.get("measurement_unit"),
                        amount: row.get("amount"),
                    })
                    .collect())
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(sql).bind(recipe_id).fetch_all(pool).await
                    .context("Failed to get recipe ingredients")?;
                Ok(rows
                    .iter()
                    .map(|row| RecipeIngredient {
                        id: row.get("id"),
                        name: row.get("name"),
                        measurement_unit: row.get("measurement_unit"),
                        amount: row.get("amount"),
                    })
                    .collect())
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_recipe_sqlite(pool: &SqlitePool, author_id: i64, input: &CreateRecipeInput) -> Result<Recipe> {
    let pub_date = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO recipes (author_id, name, image, text, cooking_time, pub_date)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(author_id)
    .bind(&input.name)
    .bind(&input.image)
    .bind(&input.text)
    .bind(input.cooking_time)
    .bind(pub_date)
    .execute(&mut *tx)
    .await
    .context("Failed to create recipe")?;
    let id = result.last_insert_rowid();

    replace_tags_sqlite(&mut tx, id, &input.tags).await?;
    replace_ingredients_sqlite(&mut tx, id, &input.ingredients).await?;

    tx.commit().await.context("Failed to commit recipe")?;

    Ok(Recipe {
        id,
        author_id,
        name: input.name.clone(),
        image: input.image.clone(),
        text: input.text.clone(),
        cooking_time: input.cooking_time,
        pub_date,
    })
}

async fn update_recipe_sqlite(pool: &SqlitePool, id: i64, input: &UpdateRecipeInput) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let exists = sqlx::query("SELECT id FROM recipes WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to look up recipe")?;
    if exists.is_none() {
        return Ok(false);
    }

    sqlx::query(
        r#"
        UPDATE recipes SET
            name = COALESCE(?, name),
            image = COALESCE(?, image),
            text = COALESCE(?, text),
            cooking_time = COALESCE(?, cooking_time)
        WHERE id = ?
        "#,
    )
    .bind(input.name.as_deref())
    .bind(input.image.as_deref())
    .bind(input.text.as_deref())
    .bind(input.cooking_time)
    .bind(id)
    .execute(&mut *tx)
    .await
    .context("Failed to update recipe")?;

    if let Some(tags) = &input.tags {
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear recipe tags")?;
        replace_tags_sqlite(&mut tx, id, tags).await?;
    }
    if let Some(ingredients) = &input.ingredients {
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear recipe ingredients")?;
        replace_ingredients_sqlite(&mut tx, id, ingredients).await?;
    }

    tx.commit().await.context("Failed to commit recipe update")?;
    Ok(true)
}

async fn replace_tags_sqlite(tx: &mut Transaction<'_, Sqlite>, recipe_id: i64, tags: &[i64]) -> Result<()> {
    for tag_id in tags {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await
            .context("Failed to link recipe tag")?;
    }
    Ok(())
}

async fn replace_ingredients_sqlite(
    tx: &mut Transaction<'_, Sqlite>,
    recipe_id: i64,
    ingredients: &[IngredientAmount],
) -> Result<()> {
    for item in ingredients {
        sqlx::query("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (?, ?, ?)")
            .bind(recipe_id)
            .bind(item.id)
            .bind(item.amount)
            .execute(&mut **tx)
            .await
            .context("Failed to add recipe ingredient")?;
    }
    Ok(())
}

fn row_to_recipe_sqlite(row: &sqlx::sqlite::SqliteRow) -> Recipe {
    Recipe {
        id: row.get("id"),
        author_id: row.get("author_id"),
        name: row.get("name"),
        image: row.get("image"),
        text: row.get("text"),
        cooking_time: row.get("cooking_time"),
        pub_date: row.get("pub_date"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_recipe_mysql(pool: &MySqlPool, author_id: i64, input: &CreateRecipeInput) -> Result<Recipe> {
    let pub_date = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO recipes (author_id, name, image, text, cooking_time, pub_date)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(author_id)
    .bind(&input.name)
    .bind(&input.image)
    .bind(&input.text)
    .bind(input.cooking_time)
    .bind(pub_date)
    .execute(&mut *tx)
    .await
    .context("Failed to create recipe")?;
    let id = result.last_insert_id() as i64;

    replace_tags_mysql(&mut tx, id, &input.tags).await?;
    replace_ingredients_mysql(&mut tx, id, &input.ingredients).await?;

    tx.commit().await.context("Failed to commit recipe")?;

    Ok(Recipe {
        id,
        author_id,
        name: input.name.clone(),
        image: input.image.clone(),
        text: input.text.clone(),
        cooking_time: input.cooking_time,
        pub_date,
    })
}

async fn update_recipe_mysql(pool: &MySqlPool, id: i64, input: &UpdateRecipeInput) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let exists = sqlx::query("SELECT id FROM recipes WHERE id = ? FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to look up recipe")?;
    if exists.is_none() {
        return Ok(false);
    }

    sqlx::query(
        r#"
        UPDATE recipes SET
            name = COALESCE(?, name),
            image = COALESCE(?, image),
            text = COALESCE(?, text),
            cooking_time = COALESCE(?, cooking_time)
        WHERE id = ?
        "#,
    )
    .bind(input.name.as_deref())
    .bind(input.image.as_deref())
    .bind(input.text.as_deref())
    .bind(input.cooking_time)
    .bind(id)
    .execute(&mut *tx)
    .await
    .context("Failed to update recipe")?;

    if let Some(tags) = &input.tags {
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear recipe tags")?;
        replace_tags_mysql(&mut tx, id, tags).await?;
    }
    if let Some(ingredients) = &input.ingredients {
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear recipe ingredients")?;
        replace_ingredients_mysql(&mut tx, id, ingredients).await?;
    }

    tx.commit().await.context("Failed to commit recipe update")?;
    Ok(true)
}

async fn replace_tags_mysql(tx: &mut Transaction<'_, MySql>, recipe_id: i64, tags: &[i64]) -> Result<()> {
    for tag_id in tags {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await
            .context("Failed to link recipe tag")?;
    }
    Ok(())
}

async fn replace_ingredients_mysql(
    tx: &mut Transaction<'_, MySql>,
    recipe_id: i64,
    ingredients: &[IngredientAmount],
) -> Result<()> {
    for item in ingredients {
        sqlx::query("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (?, ?, ?)")
            .bind(recipe_id)
            .bind(item.id)
            .bind(item.amount)
            .execute(&mut **tx)
            .await
            .context("Failed to add recipe ingredient")?;
    }
    Ok(())
}

fn row_to_recipe_mysql(row: &sqlx::mysql::MySqlRow) -> Recipe {
    Recipe {
        id: row.get("id"),
        author_id: row.get("author_id"),
        name: row.get("name"),
        image: row.get("image"),
        text: row.get("text"),
        cooking_time: row.get("cooking_time"),
        pub_date: row.get("pub_date"),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::repositories::{
        IngredientRepository, SqlxIngredientRepository, SqlxTagRepository, SqlxUserRepository,
        TagRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreateIngredientInput, CreateTagInput, CreateUserInput, UserRole};

    pub(crate) struct Fixture {
        pub pool: DynDatabasePool,
        pub repo: SqlxRecipeRepository,
        pub author: i64,
        pub reader: i64,
        pub tags: Vec<Tag>,
        pub ingredients: Vec<i64>,
    }

    /// Two users, three tags (breakfast, dinner, lunch) and three ingredients
    pub(crate) async fn fixture() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let mut ids = Vec::new();
        for name in ["author", "reader"] {
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

        let tag_repo = SqlxTagRepository::new(pool.clone());
        let mut tags = Vec::new();
        for (name, slug) in [("Breakfast", "breakfast"), ("Dinner", "dinner"), ("Lunch", "lunch")] {
            tags.push(
                tag_repo
                    .create(&CreateTagInput { name: name.to_string(), slug: slug.to_string() })
                    .await
                    .unwrap(),
            );
        }

        let ingredient_repo = SqlxIngredientRepository::new(pool.clone());
        let mut ingredients = Vec::new();
        for (name, unit) in [("egg", "pcs"), ("flour", "g"), ("milk", "ml")] {
            ingredients.push(
                ingredient_repo
                    .create(&CreateIngredientInput {
                        name: name.to_string(),
                        measurement_unit: unit.to_string(),
                    })
                    .await
                    .unwrap()
                    .id,
            );
        }

        Fixture {
            repo: SqlxRecipeRepository::new(pool.clone()),
            pool,
            author: ids[0],
            reader: ids[1],
            tags,
            ingredients,
        }
    }

    pub(crate) fn recipe_input(name: &str, tags: Vec<i64>, ingredients: Vec<(i64, i32)>) -> CreateRecipeInput {
        CreateRecipeInput {
            name: name.to_string(),
            image: "data:image/png;base64,AAAA".to_string(),
            text: "Cook it".to_string(),
            cooking_time: 10,
            tags,
            ingredients: ingredients
                .into_iter()
                .map(|(id, amount)| IngredientAmount { id, amount })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_create_with_tags_and_ingredients() {
        let f = fixture().await;
        let recipe = f
            .repo
            .create(
                f.author,
                &recipe_input("Pancakes", vec![f.tags[0].id], vec![(f.ingredients[0], 2), (f.ingredients[1], 200)]),
            )
            .await
            .unwrap();

        let stored = f.repo.get_by_id(recipe.id).await.unwrap().expect("Recipe not found");
        assert_eq!(stored.name, "Pancakes");
        assert_eq!(stored.author_id, f.author);

        let tags = f.repo.tags_for(recipe.id).await.unwrap();
        assert_eq!(tags, vec![f.tags[0].clone()]);

        let ingredients = f.repo.ingredients_for(recipe.id).await.unwrap();
        assert_eq!(ingredients.len(), 2);
        assert_eq!(ingredients[0].name, "egg");
        assert_eq!(ingredients[0].amount, 2);
        assert_eq!(ingredients[1].measurement_unit, "g");
    }

    #[tokio::test]
    async fn test_create_rolls_back_on_bad_ingredient() {
        let f = fixture().await;
        let result = f
            .repo
            .create(f.author, &recipe_input("Broken", vec![f.tags[0].id], vec![(9999, 1)]))
            .await;
        assert!(result.is_err());

        assert_eq!(f.repo.count(&RecipeFilter::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_replaces_sets_and_keeps_unset_fields() {
        let f = fixture().await;
        let recipe = f
            .repo
            .create(f.author, &recipe_input("Soup", vec![f.tags[0].id, f.tags[1].id], vec![(f.ingredients[0], 1)]))
            .await
            .unwrap();

        let updated = f
            .repo
            .update(
                recipe.id,
                &UpdateRecipeInput {
                    cooking_time: Some(45),
                    tags: Some(vec![f.tags[2].id]),
                    ingredients: Some(vec![IngredientAmount { id: f.ingredients[2], amount: 500 }]),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .expect("Recipe not found");

        assert_eq!(updated.name, "Soup");
        assert_eq!(updated.cooking_time, 45);
        assert_eq!(updated.pub_date, recipe.pub_date);
        assert_eq!(f.repo.tags_for(recipe.id).await.unwrap(), vec![f.tags[2].clone()]);
        let ingredients = f.repo.ingredients_for(recipe.id).await.unwrap();
        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0].name, "milk");
        assert_eq!(ingredients[0].amount, 500);
    }

    #[tokio::test]
    async fn test_update_missing_recipe() {
        let f = fixture().await;
        let result = f.repo.update(404, &UpdateRecipeInput::default()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let f = fixture().await;
        let recipe = f
            .repo
            .create(f.author, &recipe_input("Tea", vec![f.tags[0].id], vec![(f.ingredients[2], 100)]))
            .await
            .unwrap();

        assert!(f.repo.delete(recipe.id).await.unwrap());
        assert!(!f.repo.delete(recipe.id).await.unwrap());
        assert!(f.repo.get_by_id(recipe.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first_with_pagination() {
        let f = fixture().await;
        for name in ["first", "second", "third"] {
            f.repo
                .create(f.author, &recipe_input(name, vec![f.tags[0].id], vec![(f.ingredients[0], 1)]))
                .await
                .unwrap();
        }

        let page = f.repo.list(&RecipeFilter::default(), &ListParams::new(2, 0)).await.unwrap();
        let names: Vec<_> = page.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["third", "second"]);

        let rest = f.repo.list(&RecipeFilter::default(), &ListParams::new(2, 2)).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].name, "first");
    }

    #[tokio::test]
    async fn test_filter_by_tags_is_or_without_duplicates() {
        let f = fixture().await;
        let both = f
            .repo
            .create(f.author, &recipe_input("both", vec![f.tags[0].id, f.tags[1].id], vec![(f.ingredients[0], 1)]))
            .await
            .unwrap();
        f.repo
            .create(f.author, &recipe_input("lunch only", vec![f.tags[2].id], vec![(f.ingredients[0], 1)]))
            .await
            .unwrap();

        let filter = RecipeFilter {
            tags: vec!["breakfast".to_string(), "dinner".to_string()],
            ..Default::default()
        };
        let found = f.repo.list(&filter, &ListParams::new(10, 0)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, both.id);
        assert_eq!(f.repo.count(&filter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_filter_by_author_and_collections() {
        let f = fixture().await;
        let a = f
            .repo
            .create(f.author, &recipe_input("by author", vec![f.tags[0].id], vec![(f.ingredients[0], 1)]))
            .await
            .unwrap();
        let b = f
            .repo
            .create(f.reader, &recipe_input("by reader", vec![f.tags[0].id], vec![(f.ingredients[0], 1)]))
            .await
            .unwrap();

        let Backend::Sqlite(sqlite) = f.pool.backend() else {
            panic!("expected sqlite backend");
        };
        sqlx::query("INSERT INTO favorites (user_id, recipe_id) VALUES (?, ?)")
            .bind(f.reader)
            .bind(a.id)
            .execute(sqlite)
            .await
            .unwrap();
        sqlx::query("INSERT INTO shopping_carts (user_id, recipe_id) VALUES (?, ?)")
            .bind(f.reader)
            .bind(b.id)
            .execute(sqlite)
            .await
            .unwrap();

        let by_author = RecipeFilter { author: Some(f.reader), ..Default::default() };
        assert_eq!(f.repo.count(&by_author).await.unwrap(), 1);

        let favorited = RecipeFilter { favorited_by: Some(f.reader), ..Default::default() };
        let found = f.repo.list(&favorited, &ListParams::new(10, 0)).await.unwrap();
        assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a.id]);

        let in_cart = RecipeFilter { in_cart_of: Some(f.reader), ..Default::default() };
        let found = f.repo.list(&in_cart, &ListParams::new(10, 0)).await.unwrap();
        assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![b.id]);

        let both = RecipeFilter {
            favorited_by: Some(f.reader),
            in_cart_of: Some(f.reader),
            ..Default::default()
        };
        assert_eq!(f.repo.count(&both).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_and_count_by_author() {
        let f = fixture().await;
        for name in ["one", "two", "three"] {
            f.repo
                .create(f.author, &recipe_input(name, vec![f.tags[0].id], vec![(f.ingredients[0], 1)]))
                .await
                .unwrap();
        }

        assert_eq!(f.repo.count_by_author(f.author).await.unwrap(), 3);
        assert_eq!(f.repo.count_by_author(f.reader).await.unwrap(), 0);

        let limited = f.repo.list_by_author(f.author, Some(2)).await.unwrap();
        assert_eq!(limited.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), vec!["three", "two"]);
        assert_eq!(f.repo.list_by_author(f.author, None).await.unwrap().len(), 3);
    }
}
