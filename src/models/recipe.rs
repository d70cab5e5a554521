//! Recipe model
//!
//! A recipe belongs to an author, carries a set of tags and a list of
//! ingredients with amounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Tag, User};

/// A published recipe row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipe {
    pub id: i64,
    pub author_id: i64,
    pub name: String,
    /// Image as submitted (data URI or URL)
    pub image: String,
    pub text: String,
    /// Cooking time in minutes
    pub cooking_time: i32,
    /// Set on creation and never changed
    pub pub_date: DateTime<Utc>,
}

/// Ingredient line of a recipe: ingredient fields plus the amount
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeIngredient {
    /// Ingredient id
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Ingredient reference in recipe input
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngredientAmount {
    /// Ingredient id
    pub id: i64,
    pub amount: i32,
}

/// Validated input for creating a recipe
#[derive(Debug, Clone)]
pub struct CreateRecipeInput {
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub tags: Vec<i64>,
    pub ingredients: Vec<IngredientAmount>,
}

/// Input for a partial recipe update
///
/// Scalar fields left as `None` keep their value. `tags` and `ingredients`
/// replace the stored sets and are required by the recipe service.
#[derive(Debug, Clone, Default)]
pub struct UpdateRecipeInput {
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
}

/// Filters for listing recipes
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    /// Only recipes by this author
    pub author: Option<i64>,
    /// Tag slugs; a recipe matches if it has any of them
    pub tags: Vec<String>,
    /// Only recipes in this user's favorites
    pub favorited_by: Option<i64>,
    /// Only recipes in this user's shopping cart
    pub in_cart_of: Option<i64>,
}

impl RecipeFilter {
    /// Drop duplicate and empty tag slugs, keeping first-seen order
    pub fn normalized(mut self) -> Self {
        let mut seen = std::collections::HashSet::new();
        self.tags.retain(|slug| !slug.is_empty() && seen.insert(slug.clone()));
        self
    }
}

/// Compact recipe view used by favorites, cart and subscriptions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeShort {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<&Recipe> for RecipeShort {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            image: recipe.image.clone(),
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Full recipe as seen by a viewer
#[derive(Debug, Clone)]
pub struct RecipeDetail {
    pub recipe: Recipe,
    pub author: User,
    /// Whether the viewer follows the author
    pub author_subscribed: bool,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_normalized_dedups_tags() {
        let filter = RecipeFilter {
            tags: vec![
                "lunch".to_string(),
                "".to_string(),
                "breakfast".to_string(),
                "lunch".to_string(),
            ],
            ..Default::default()
        }
        .normalized();

        assert_eq!(filter.tags, vec!["lunch".to_string(), "breakfast".to_string()]);
    }

    #[test]
    fn test_recipe_short_from_recipe() {
        let recipe = Recipe {
            id: 5,
            author_id: 1,
            name: "Borscht".to_string(),
            image: "img".to_string(),
            text: "Boil".to_string(),
            cooking_time: 90,
            pub_date: Utc::now(),
        };
        let short = RecipeShort::from(&recipe);
        assert_eq!(short.id, 5);
        assert_eq!(short.cooking_time, 90);
        assert_eq!(short.name, "Borscht");
    }
}
