//! Short link service
//!
//! Each recipe gets at most one random base62 slug. Resolving a slug is
//! cached; numeric slugs that were never issued fall back to the recipe ID
//! so that `/s/42/` keeps working for hand-typed links.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{RecipeRepository, ShortLinkRepository};
use crate::models::ShortLink;
use anyhow::Context;
use std::sync::Arc;
use uuid::Uuid;

const CACHE_PREFIX: &str = "short_link:";
const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const MAX_ATTEMPTS: usize = 10;

/// Largest multiple of 62 that fits a byte; values at or above it are
/// rejected so every symbol is equally likely.
const REJECT_FROM: u8 = 248;

/// Error types for short link operations
#[derive(Debug, thiserror::Error)]
pub enum ShortLinkServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Random base62 slug of `length` symbols.
///
/// Randomness comes from v4 UUIDs; bytes 6 and 8 carry the version and
/// variant bits and are skipped.
pub fn generate_slug(length: usize) -> String {
    let mut slug = String::with_capacity(length);
    while slug.len() < length {
        let bytes = Uuid::new_v4().into_bytes();
        for (index, byte) in bytes.iter().enumerate() {
            if slug.len() == length {
                break;
            }
            if index == 6 || index == 8 || *byte >= REJECT_FROM {
                continue;
            }
            slug.push(ALPHABET[(*byte % 62) as usize] as char);
        }
    }
    slug
}

/// Short link service
pub struct ShortLinkService {
    links: Arc<dyn ShortLinkRepository>,
    recipes: Arc<dyn RecipeRepository>,
    cache: Arc<Cache>,
    length: usize,
}

impl ShortLinkService {
    pub fn new(
        links: Arc<dyn ShortLinkRepository>,
        recipes: Arc<dyn RecipeRepository>,
        cache: Arc<Cache>,
        length: usize,
    ) -> Self {
        Self {
            links,
            recipes,
            cache,
            length,
        }
    }

    /// Existing link of the recipe, or a new one
    pub async fn get_or_create(&self, recipe_id: i64) -> Result<ShortLink, ShortLinkServiceError> {
        if self
            .recipes
            .get_by_id(recipe_id)
            .await
            .context("Failed to get recipe")?
            .is_none()
        {
            return Err(ShortLinkServiceError::NotFound(format!("Recipe {} not found", recipe_id)));
        }

        if let Some(link) = self.links.get_by_recipe(recipe_id).await? {
            return Ok(link);
        }

        for attempt in 1..=MAX_ATTEMPTS {
            let slug = generate_slug(self.length);
            if self.links.get_by_slug(&slug).await?.is_some() {
                tracing::debug!(attempt, "Short link slug collision");
                continue;
            }

            match self.links.create(&slug, recipe_id).await {
                Ok(link) => {
                    tracing::debug!(recipe_id, slug = %link.slug, "Short link created");
                    return Ok(link);
                }
                Err(e) => {
                    // A concurrent request may have linked the recipe first
                    if let Some(link) = self.links.get_by_recipe(recipe_id).await? {
                        return Ok(link);
                    }
                    tracing::warn!(attempt, "Failed to store short link: {:#}", e);
                }
            }
        }

        Err(anyhow::anyhow!(
            "Could not allocate a short link for recipe {} after {} attempts",
            recipe_id,
            MAX_ATTEMPTS
        )
        .into())
    }

    /// Recipe ID behind a slug
    pub async fn resolve(&self, slug: &str) -> Result<i64, ShortLinkServiceError> {
        let key = format!("{}{}", CACHE_PREFIX, slug);
        if let Some(id) = self.cache.get::<i64>(&key).await.ok().flatten() {
            return Ok(id);
        }

        let recipe_id = match self.links.get_by_slug(slug).await? {
            Some(link) => link.recipe_id,
            None => self.resolve_numeric(slug).await?,
        };

        let _ = self.cache.set(&key, &recipe_id, self.cache.default_ttl()).await;
        Ok(recipe_id)
    }

    async fn resolve_numeric(&self, slug: &str) -> Result<i64, ShortLinkServiceError> {
        let not_found = || ShortLinkServiceError::NotFound(format!("Short link {} not found", slug));

        if slug.is_empty() || !slug.bytes().all(|b| b.is_ascii_digit()) {
            return Err(not_found());
        }
        let id: i64 = slug.parse().map_err(|_| not_found())?;

        match self.recipes.get_by_id(id).await.context("Failed to get recipe")? {
            Some(recipe) => Ok(recipe.id),
            None => Err(not_found()),
        }
    }
}
