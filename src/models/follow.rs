//! Subscription (follow) model

use super::{RecipeShort, User};

/// An author as listed in someone's subscriptions
#[derive(Debug, Clone)]
pub struct AuthorCard {
    pub author: User,
    /// Whether the viewer follows this author
    pub is_subscribed: bool,
    /// Newest recipes first, cut to the requested `recipes_limit`
    pub recipes: Vec<RecipeShort>,
    /// Total number of recipes by the author
    pub recipes_count: i64,
}
