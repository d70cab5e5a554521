//! Tag service
//!
//! Tags are reference data: read on every recipe form, written only by
//! imports. The full list is cached and dropped whenever an import adds tags.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::TagRepository;
use crate::models::{CreateTagInput, Tag};
use crate::services::{FieldErrors, ImportSummary};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

const CACHE_KEY_ALL: &str = "tags:all";

pub const MAX_TAG_NAME_LENGTH: usize = 256;
pub const MAX_TAG_SLUG_LENGTH: usize = 50;

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid regex"));

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Tag not found
    #[error("Tag not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service
pub struct TagService {
    repo: Arc<dyn TagRepository>,
    cache: Arc<Cache>,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    /// All tags ordered by name
    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        if let Some(tags) = self.cache.get::<Vec<Tag>>(CACHE_KEY_ALL).await.ok().flatten() {
            return Ok(tags);
        }

        let tags = self.repo.list().await.context("Failed to list tags")?;
        let _ = self.cache.set(CACHE_KEY_ALL, &tags, self.cache.default_ttl()).await;
        Ok(tags)
    }

    /// Get tag by ID
    pub async fn get(&self, id: i64) -> Result<Tag, TagServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get tag by ID")?
            .ok_or_else(|| TagServiceError::NotFound(format!("Tag {} not found", id)))
    }

    /// Create tags, skipping any whose name or slug already exists
    ///
    /// Every entry is validated before anything is written; one invalid
    /// entry rejects the whole batch.
    pub async fn import(&self, inputs: Vec<CreateTagInput>) -> Result<ImportSummary, TagServiceError> {
        let inputs: Vec<CreateTagInput> = inputs
            .into_iter()
            .map(|t| CreateTagInput {
                name: t.name.trim().to_string(),
                slug: t.slug.trim().to_string(),
            })
            .collect();

        let mut errors = FieldErrors::new();
        for (index, input) in inputs.iter().enumerate() {
            validate_tag(index, input, &mut errors);
        }
        errors.into_result().map_err(TagServiceError::ValidationError)?;

        let mut summary = ImportSummary::default();
        for input in &inputs {
            let by_name = self.repo.get_by_name(&input.name).await.context("Failed to check tag name")?;
            let by_slug = self.repo.get_by_slug(&input.slug).await.context("Failed to check tag slug")?;
            if by_name.is_some() || by_slug.is_some() {
                tracing::debug!(slug = %input.slug, "Skipping existing tag");
                summary.skipped += 1;
                continue;
            }

            self.repo.create(input).await.context("Failed to create tag")?;
            summary.created += 1;
        }

        if summary.created > 0 {
            let _ = self.cache.delete(CACHE_KEY_ALL).await;
        }
        tracing::info!(created = summary.created, skipped = summary.skipped, "Tags imported");
        Ok(summary)
    }
}

fn validate_tag(index: usize, input: &CreateTagInput, errors: &mut FieldErrors) {
    let name_field = format!("tags[{}].name", index);
    let slug_field = format!("tags[{}].slug", index);

    if input.name.is_empty() {
        errors.add(&name_field, "This field is required.");
    } else if input.name.chars().count() > MAX_TAG_NAME_LENGTH {
        errors.add(&name_field, format!("Ensure this field has no more than {} characters.", MAX_TAG_NAME_LENGTH));
    }

    if input.slug.is_empty() {
        errors.add(&slug_field, "This field is required.");
    } else if input.slug.len() > MAX_TAG_SLUG_LENGTH {
        errors.add(&slug_field, format!("Ensure this field has no more than {} characters.", MAX_TAG_SLUG_LENGTH));
    } else if !SLUG_RE.is_match(&input.slug) {
        errors.add(&slug_field, "Enter a valid slug: letters, digits, underscores or hyphens.");
    }
}
