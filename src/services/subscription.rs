//! Subscription service
//!
//! Follows between users and the author cards shown on the subscriptions
//! page: profile, newest recipes (optionally limited) and recipe count.

use crate::db::repositories::{FollowRepository, RecipeRepository, UserRepository};
use crate::models::{AuthorCard, ListParams, PagedResult, RecipeShort, User};
use anyhow::Context;
use std::sync::Arc;

/// Error types for subscription operations
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionServiceError {
    #[error("Author not found: {0}")]
    NotFound(String),

    /// Self-subscription, duplicate subscription or unsubscribing twice
    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Subscription service
pub struct SubscriptionService {
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
    recipes: Arc<dyn RecipeRepository>,
}

impl SubscriptionService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        follows: Arc<dyn FollowRepository>,
        recipes: Arc<dyn RecipeRepository>,
    ) -> Self {
        Self { users, follows, recipes }
    }

    /// Follow an author and return their card
    pub async fn subscribe(
        &self,
        user: &User,
        author_id: i64,
        recipes_limit: Option<i64>,
    ) -> Result<AuthorCard, SubscriptionServiceError> {
        let author = self.find_author(author_id).await?;
        if author.id == user.id {
            return Err(SubscriptionServiceError::Conflict(
                "You cannot subscribe to yourself".to_string(),
            ));
        }

        if !self.follows.follow(user.id, author.id).await? {
            return Err(SubscriptionServiceError::Conflict(format!(
                "Already subscribed to {}",
                author.username
            )));
        }

        tracing::debug!(user_id = user.id, author_id, "Subscribed");
        self.card(author, true, recipes_limit).await
    }

    /// Stop following an author
    pub async fn unsubscribe(&self, user: &User, author_id: i64) -> Result<(), SubscriptionServiceError> {
        let author = self.find_author(author_id).await?;

        if !self.follows.unfollow(user.id, author.id).await? {
            return Err(SubscriptionServiceError::Conflict(format!(
                "Not subscribed to {}",
                author.username
            )));
        }

        Ok(())
    }

    /// Authors the user follows, ordered by author ID
    pub async fn list(
        &self,
        user: &User,
        params: &ListParams,
        recipes_limit: Option<i64>,
    ) -> Result<PagedResult<AuthorCard>, SubscriptionServiceError> {
        let authors = self
            .follows
            .list_authors(user.id, params)
            .await
            .context("Failed to list subscriptions")?;
        let total = self
            .follows
            .count_authors(user.id)
            .await
            .context("Failed to count subscriptions")?;

        let mut cards = Vec::with_capacity(authors.len());
        for author in authors {
            cards.push(self.card(author, true, recipes_limit).await?);
        }

        Ok(PagedResult::new(cards, total, params))
    }

    async fn find_author(&self, author_id: i64) -> Result<User, SubscriptionServiceError> {
        self.users
            .get_by_id(author_id)
            .await
            .context("Failed to get author")?
            .ok_or_else(|| SubscriptionServiceError::NotFound(format!("User {} not found", author_id)))
    }

    async fn card(
        &self,
        author: User,
        is_subscribed: bool,
        recipes_limit: Option<i64>,
    ) -> Result<AuthorCard, SubscriptionServiceError> {
        let recipes = self
            .recipes
            .list_by_author(author.id, recipes_limit)
            .await
            .context("Failed to list author recipes")?;
        let recipes_count = self
            .recipes
            .count_by_author(author.id)
            .await
            .context("Failed to count author recipes")?;

        Ok(AuthorCard {
            author,
            is_subscribed,
            recipes: recipes.iter().map(RecipeShort::from).collect(),
            recipes_count,
        })
    }
}
