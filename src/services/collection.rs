//! Favorites and shopping cart service

use crate::db::repositories::{CollectionKind, CollectionRepository, RecipeRepository};
use crate::models::RecipeShort;
use anyhow::Context;
use std::sync::Arc;

/// Error types for collection operations
#[derive(Debug, thiserror::Error)]
pub enum CollectionServiceError {
    #[error("Recipe not found: {0}")]
    NotFound(String),

    /// Adding a recipe twice or removing one that is absent
    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Adds recipes to and removes them from a user's favorites or cart
pub struct CollectionService {
    recipes: Arc<dyn RecipeRepository>,
    collections: Arc<dyn CollectionRepository>,
}

impl CollectionService {
    pub fn new(recipes: Arc<dyn RecipeRepository>, collections: Arc<dyn CollectionRepository>) -> Self {
        Self { recipes, collections }
    }

    /// Add a recipe, returning its short form
    pub async fn add(
        &self,
        kind: CollectionKind,
        user_id: i64,
        recipe_id: i64,
    ) -> Result<RecipeShort, CollectionServiceError> {
        let recipe = self
            .recipes
            .get_by_id(recipe_id)
            .await
            .context("Failed to get recipe")?
            .ok_or_else(|| CollectionServiceError::NotFound(format!("Recipe {} not found", recipe_id)))?;

        if !self.collections.add(kind, user_id, recipe_id).await? {
            return Err(CollectionServiceError::Conflict(format!(
                "Recipe is already in {}",
                kind
            )));
        }

        tracing::debug!(user_id, recipe_id, collection = %kind, "Recipe added");
        Ok(RecipeShort::from(&recipe))
    }

    /// Remove a recipe
    pub async fn remove(&self, kind: CollectionKind, user_id: i64, recipe_id: i64) -> Result<(), CollectionServiceError> {
        if self.recipes.get_by_id(recipe_id).await.context("Failed to get recipe")?.is_none() {
            return Err(CollectionServiceError::NotFound(format!("Recipe {} not found", recipe_id)));
        }

        if !self.collections.remove(kind, user_id, recipe_id).await? {
            return Err(CollectionServiceError::Conflict(format!("Recipe is not in {}", kind)));
        }

        Ok(())
    }
}
