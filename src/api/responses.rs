//! Shared API response types
//!
//! JSON shapes returned by more than one endpoint. Tags, ingredients and
//! short recipes serialize straight from their models.

use serde::{Deserialize, Serialize};

use crate::models::{AuthorCard, RecipeDetail, RecipeIngredient, RecipeShort, Tag, User, UserProfile};

// ============================================================================
// Users
// ============================================================================

/// A user as seen by the requester
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

impl UserResponse {
    pub fn new(user: User, is_subscribed: bool) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
            avatar: user.avatar,
        }
    }
}

impl From<UserProfile> for UserResponse {
    fn from(profile: UserProfile) -> Self {
        Self::new(profile.user, profile.is_subscribed)
    }
}

/// Body returned after registration
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedUserResponse {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for CreatedUserResponse {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// Author card on the subscriptions page
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorCardResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: i64,
}

impl From<AuthorCard> for AuthorCardResponse {
    fn from(card: AuthorCard) -> Self {
        Self {
            user: UserResponse::new(card.author, card.is_subscribed),
            recipes: card.recipes,
            recipes_count: card.recipes_count,
        }
    }
}

// ============================================================================
// Recipes
// ============================================================================

/// Full recipe
#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub tags: Vec<Tag>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

impl From<RecipeDetail> for RecipeResponse {
    fn from(detail: RecipeDetail) -> Self {
        Self {
            id: detail.recipe.id,
            tags: detail.tags,
            author: UserResponse::new(detail.author, detail.author_subscribed),
            ingredients: detail.ingredients,
            is_favorited: detail.is_favorited,
            is_in_shopping_cart: detail.is_in_shopping_cart,
            name: detail.recipe.name,
            image: detail.recipe.image,
            text: detail.recipe.text,
            cooking_time: detail.recipe.cooking_time,
        }
    }
}

/// `{"short-link": url}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ShortLinkResponse {
    #[serde(rename = "short-link")]
    pub short_link: String,
}
