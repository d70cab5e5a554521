//! Data models
//!
//! Database entities (User, AuthToken, Tag, Ingredient, Recipe, ShortLink),
//! service inputs and the read views services hand to the API layer.

mod follow;
mod ingredient;
mod pagination;
mod recipe;
mod shopping;
mod short_link;
mod tag;
mod token;
mod user;

pub use follow::AuthorCard;
pub use ingredient::{CreateIngredientInput, Ingredient};
pub use pagination::{ListParams, PagedResult};
pub use recipe::{
    CreateRecipeInput, IngredientAmount, Recipe, RecipeDetail, RecipeFilter, RecipeIngredient,
    RecipeShort, UpdateRecipeInput,
};
pub use shopping::{CartRecipe, ShoppingList, ShoppingListItem};
pub use short_link::ShortLink;
pub use tag::{CreateTagInput, Tag};
pub use token::AuthToken;
pub use user::{CreateUserInput, User, UserProfile, UserRole};
