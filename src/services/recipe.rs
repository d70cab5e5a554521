//! Recipe service
//!
//! Validates recipe writes, enforces author/moderator permissions and builds
//! the viewer-specific detail view (subscription, favorite and cart flags).

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{
    CollectionKind, CollectionRepository, FollowRepository, IngredientRepository, RecipeRepository,
    TagRepository, UserRepository,
};
use crate::models::{
    CreateRecipeInput, IngredientAmount, ListParams, PagedResult, Recipe, RecipeDetail, RecipeFilter,
    UpdateRecipeInput, User,
};
use crate::services::FieldErrors;
use anyhow::Context;
use std::collections::HashSet;
use std::sync::Arc;

pub const MAX_RECIPE_NAME_LENGTH: usize = 256;
pub const MIN_AMOUNT: i32 = 1;
pub const MAX_AMOUNT: i32 = 32000;

/// Error types for recipe service operations
#[derive(Debug, thiserror::Error)]
pub enum RecipeServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Listing filters as they arrive from the query string
#[derive(Debug, Clone, Default)]
pub struct RecipeQuery {
    pub author: Option<i64>,
    /// Tag slugs, any of which may match
    pub tags: Vec<String>,
    /// Restrict to the viewer's favorites
    pub is_favorited: bool,
    /// Restrict to the viewer's shopping cart
    pub is_in_shopping_cart: bool,
}

/// Recipe service
pub struct RecipeService {
    recipes: Arc<dyn RecipeRepository>,
    tags: Arc<dyn TagRepository>,
    ingredients: Arc<dyn IngredientRepository>,
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
    collections: Arc<dyn CollectionRepository>,
    cache: Arc<Cache>,
}

impl RecipeService {
    pub fn new(
        recipes: Arc<dyn RecipeRepository>,
        tags: Arc<dyn TagRepository>,
        ingredients: Arc<dyn IngredientRepository>,
        users: Arc<dyn UserRepository>,
        follows: Arc<dyn FollowRepository>,
        collections: Arc<dyn CollectionRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            recipes,
            tags,
            ingredients,
            users,
            follows,
            collections,
            cache,
        }
    }

    /// Publish a recipe
    ///
    /// # Errors
    ///
    /// - `ValidationError` for invalid fields or unknown tags
    /// - `NotFound` for an unknown ingredient
    pub async fn create(&self, author: &User, input: CreateRecipeInput) -> Result<RecipeDetail, RecipeServiceError> {
        let input = CreateRecipeInput {
            name: input.name.trim().to_string(),
            ..input
        };

        let mut errors = FieldErrors::new();
        validate_name(&input.name, &mut errors);
        validate_text(&input.text, &mut errors);
        validate_image(&input.image, &mut errors);
        validate_cooking_time(input.cooking_time, &mut errors);
        validate_tags(Some(&input.tags), &mut errors);
        validate_ingredients(Some(&input.ingredients), &mut errors);
        errors.into_result().map_err(RecipeServiceError::ValidationError)?;

        self.check_references(&input.tags, &input.ingredients).await?;

        let recipe = self
            .recipes
            .create(author.id, &input)
            .await
            .context("Failed to create recipe")?;

        tracing::info!(recipe_id = recipe.id, author_id = author.id, "Recipe created");
        self.detail(recipe, Some(author)).await
    }

    /// Partially update a recipe; tags and ingredients are always replaced
    pub async fn update(
        &self,
        user: &User,
        id: i64,
        input: UpdateRecipeInput,
    ) -> Result<RecipeDetail, RecipeServiceError> {
        let recipe = self.find(id).await?;
        if !user.can_edit(recipe.author_id) {
            return Err(RecipeServiceError::PermissionDenied(
                "Only the author or a moderator can change this recipe".to_string(),
            ));
        }

        let input = UpdateRecipeInput {
            name: input.name.map(|n| n.trim().to_string()),
            ..input
        };

        let mut errors = FieldErrors::new();
        if let Some(name) = &input.name {
            validate_name(name, &mut errors);
        }
        if let Some(text) = &input.text {
            validate_text(text, &mut errors);
        }
        if let Some(image) = &input.image {
            validate_image(image, &mut errors);
        }
        if let Some(cooking_time) = input.cooking_time {
            validate_cooking_time(cooking_time, &mut errors);
        }
        validate_tags(input.tags.as_deref(), &mut errors);
        validate_ingredients(input.ingredients.as_deref(), &mut errors);
        errors.into_result().map_err(RecipeServiceError::ValidationError)?;

        let tags = input.tags.as_deref().unwrap_or_default();
        let ingredients = input.ingredients.as_deref().unwrap_or_default();
        self.check_references(tags, ingredients).await?;

        let updated = self
            .recipes
            .update(id, &input)
            .await
            .context("Failed to update recipe")?
            .ok_or_else(|| RecipeServiceError::NotFound(format!("Recipe {} not found", id)))?;

        tracing::info!(recipe_id = id, user_id = user.id, "Recipe updated");
        self.detail(updated, Some(user)).await
    }

    /// Delete a recipe
    pub async fn delete(&self, user: &User, id: i64) -> Result<(), RecipeServiceError> {
        let recipe = self.find(id).await?;
        if !user.can_edit(recipe.author_id) {
            return Err(RecipeServiceError::PermissionDenied(
                "Only the author or a moderator can delete this recipe".to_string(),
            ));
        }

        self.recipes.delete(id).await.context("Failed to delete recipe")?;
        // Slugs of the deleted recipe may still sit in the resolve cache
        let _ = self.cache.delete_pattern("short_link:*").await;

        tracing::info!(recipe_id = id, user_id = user.id, "Recipe deleted");
        Ok(())
    }

    /// A recipe as seen by `viewer`
    pub async fn get(&self, id: i64, viewer: Option<&User>) -> Result<RecipeDetail, RecipeServiceError> {
        let recipe = self.find(id).await?;
        self.detail(recipe, viewer).await
    }

    /// Filtered, paginated recipes, newest first
    ///
    /// Favorite and cart filters need a viewer; anonymous requests using
    /// them get an empty page.
    pub async fn list(
        &self,
        query: RecipeQuery,
        viewer: Option<&User>,
        params: &ListParams,
    ) -> Result<PagedResult<RecipeDetail>, RecipeServiceError> {
        if viewer.is_none() && (query.is_favorited || query.is_in_shopping_cart) {
            return Ok(PagedResult::new(Vec::new(), 0, params));
        }

        let viewer_id = viewer.map(|v| v.id);
        let filter = RecipeFilter {
            author: query.author,
            tags: query.tags,
            favorited_by: viewer_id.filter(|_| query.is_favorited),
            in_cart_of: viewer_id.filter(|_| query.is_in_shopping_cart),
        }
        .normalized();

        let recipes = self.recipes.list(&filter, params).await.context("Failed to list recipes")?;
        let total = self.recipes.count(&filter).await.context("Failed to count recipes")?;

        let mut items = Vec::with_capacity(recipes.len());
        for recipe in recipes {
            items.push(self.detail(recipe, viewer).await?);
        }

        Ok(PagedResult::new(items, total, params))
    }

    /// Get a recipe or fail with `NotFound`
    pub async fn find(&self, id: i64) -> Result<Recipe, RecipeServiceError> {
        self.recipes
            .get_by_id(id)
            .await
            .context("Failed to get recipe")?
            .ok_or_else(|| RecipeServiceError::NotFound(format!("Recipe {} not found", id)))
    }

    async fn detail(&self, recipe: Recipe, viewer: Option<&User>) -> Result<RecipeDetail, RecipeServiceError> {
        let author = self
            .users
            .get_by_id(recipe.author_id)
            .await
            .context("Failed to get recipe author")?
            .ok_or_else(|| anyhow::anyhow!("Author {} of recipe {} is missing", recipe.author_id, recipe.id))?;
        let tags = self.recipes.tags_for(recipe.id).await.context("Failed to get recipe tags")?;
        let ingredients = self
            .recipes
            .ingredients_for(recipe.id)
            .await
            .context("Failed to get recipe ingredients")?;

        let (author_subscribed, is_favorited, is_in_shopping_cart) = match viewer {
            Some(viewer) => {
                let subscribed = viewer.id != author.id
                    && self
                        .follows
                        .exists(viewer.id, author.id)
                        .await
                        .context("Failed to check subscription")?;
                let favorited = self
                    .collections
                    .contains(CollectionKind::Favorites, viewer.id, recipe.id)
                    .await?;
                let in_cart = self
                    .collections
                    .contains(CollectionKind::ShoppingCart, viewer.id, recipe.id)
                    .await?;
                (subscribed, favorited, in_cart)
            }
            None => (false, false, false),
        };

        Ok(RecipeDetail {
            recipe,
            author,
            author_subscribed,
            tags,
            ingredients,
            is_favorited,
            is_in_shopping_cart,
        })
    }

    /// Unknown tags are a validation error; an unknown ingredient is a 404
    async fn check_references(
        &self,
        tags: &[i64],
        ingredients: &[IngredientAmount],
    ) -> Result<(), RecipeServiceError> {
        let known_tags: HashSet<i64> = self
            .tags
            .get_by_ids(tags)
            .await
            .context("Failed to look up tags")?
            .into_iter()
            .map(|t| t.id)
            .collect();
        let mut errors = FieldErrors::new();
        for id in tags.iter().filter(|id| !known_tags.contains(id)) {
            errors.add("tags", format!("Tag {} does not exist.", id));
        }
        errors.into_result().map_err(RecipeServiceError::ValidationError)?;

        let ids: Vec<i64> = ingredients.iter().map(|i| i.id).collect();
        let known: HashSet<i64> = self
            .ingredients
            .get_by_ids(&ids)
            .await
            .context("Failed to look up ingredients")?
            .into_iter()
            .map(|i| i.id)
            .collect();
        if let Some(missing) = ids.iter().find(|id| !known.contains(id)) {
            return Err(RecipeServiceError::NotFound(format!("Ingredient {} not found", missing)));
        }

        Ok(())
    }
}

// ============================================================================
// Validation
// ============================================================================

fn validate_name(name: &str, errors: &mut FieldErrors) {
    if name.is_empty() {
        errors.add("name", "This field is required.");
    } else if name.chars().count() > MAX_RECIPE_NAME_LENGTH {
        errors.add("name", format!("Ensure this field has no more than {} characters.", MAX_RECIPE_NAME_LENGTH));
    }
}

fn validate_text(text: &str, errors: &mut FieldErrors) {
    if text.trim().is_empty() {
        errors.add("text", "This field is required.");
    }
}

fn validate_image(image: &str, errors: &mut FieldErrors) {
    if image.trim().is_empty() {
        errors.add("image", "This field is required.");
    }
}

fn validate_cooking_time(cooking_time: i32, errors: &mut FieldErrors) {
    if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&cooking_time) {
        errors.add(
            "cooking_time",
            format!("Cooking time must be between {} and {} minutes.", MIN_AMOUNT, MAX_AMOUNT),
        );
    }
}

fn validate_tags(tags: Option<&[i64]>, errors: &mut FieldErrors) {
    let tags = match tags {
        Some(t) if !t.is_empty() => t,
        _ => {
            errors.add("tags", "At least one tag is required.");
            return;
        }
    };

    let mut seen = HashSet::new();
    if tags.iter().any(|id| !seen.insert(*id)) {
        errors.add("tags", "Tags must not repeat.");
    }
}

fn validate_ingredients(ingredients: Option<&[IngredientAmount]>, errors: &mut FieldErrors) {
    let ingredients = match ingredients {
        Some(i) if !i.is_empty() => i,
        _ => {
            errors.add("ingredients", "At least one ingredient is required.");
            return;
        }
    };

    let mut seen = HashSet::new();
    if ingredients.iter().any(|i| !seen.insert(i.id)) {
        errors.add("ingredients", "Ingredients must not repeat.");
    }
    if ingredients.iter().any(|i| !(MIN_AMOUNT..=MAX_AMOUNT).contains(&i.amount)) {
        errors.add(
            "ingredients",
            format!("Amount must be between {} and {}.", MIN_AMOUNT, MAX_AMOUNT),
        );
    }
}
