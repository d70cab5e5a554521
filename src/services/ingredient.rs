//! Ingredient service
//!
//! The name filter is a case-insensitive prefix match done here rather than
//! in SQL, because SQLite's `LOWER` only folds ASCII and ingredient names are
//! often Cyrillic. The full list and each prefix search are cached.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::IngredientRepository;
use crate::models::{CreateIngredientInput, Ingredient};
use crate::services::{FieldErrors, ImportSummary};
use anyhow::Context;
use std::collections::HashSet;
use std::sync::Arc;

const CACHE_KEY_ALL: &str = "ingredients:all";
const CACHE_PREFIX_SEARCH: &str = "ingredients:search:";

pub const MAX_INGREDIENT_NAME_LENGTH: usize = 128;
pub const MAX_UNIT_LENGTH: usize = 64;

/// Error types for ingredient service operations
#[derive(Debug, thiserror::Error)]
pub enum IngredientServiceError {
    #[error("Ingredient not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Ingredient service
pub struct IngredientService {
    repo: Arc<dyn IngredientRepository>,
    cache: Arc<Cache>,
}

impl IngredientService {
    pub fn new(repo: Arc<dyn IngredientRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    /// Ingredients ordered by name, optionally restricted to names starting
    /// with `name` (case-insensitive)
    pub async fn list(&self, name: Option<&str>) -> Result<Vec<Ingredient>, IngredientServiceError> {
        let prefix = name.map(|n| n.trim().to_lowercase()).filter(|n| !n.is_empty());
        let prefix = match prefix {
            Some(p) => p,
            None => return self.all().await,
        };

        let key = format!("{}{}", CACHE_PREFIX_SEARCH, prefix);
        if let Some(found) = self.cache.get::<Vec<Ingredient>>(&key).await.ok().flatten() {
            return Ok(found);
        }

        let found: Vec<Ingredient> = self
            .all()
            .await?
            .into_iter()
            .filter(|i| i.name.to_lowercase().starts_with(&prefix))
            .collect();
        let _ = self.cache.set(&key, &found, self.cache.default_ttl()).await;
        Ok(found)
    }

    /// Get ingredient by ID
    pub async fn get(&self, id: i64) -> Result<Ingredient, IngredientServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get ingredient by ID")?
            .ok_or_else(|| IngredientServiceError::NotFound(format!("Ingredient {} not found", id)))
    }

    /// Create ingredients, skipping existing (name, measurement_unit) pairs
    /// and repeats within the batch
    pub async fn import(
        &self,
        inputs: Vec<CreateIngredientInput>,
    ) -> Result<ImportSummary, IngredientServiceError> {
        let inputs: Vec<CreateIngredientInput> = inputs
            .into_iter()
            .map(|i| CreateIngredientInput {
                name: i.name.trim().to_string(),
                measurement_unit: i.measurement_unit.trim().to_string(),
            })
            .collect();

        let mut errors = FieldErrors::new();
        for (index, input) in inputs.iter().enumerate() {
            check_length(&mut errors, &format!("ingredients[{}].name", index), &input.name, MAX_INGREDIENT_NAME_LENGTH);
            check_length(
                &mut errors,
                &format!("ingredients[{}].measurement_unit", index),
                &input.measurement_unit,
                MAX_UNIT_LENGTH,
            );
        }
        errors.into_result().map_err(IngredientServiceError::ValidationError)?;

        let mut summary = ImportSummary::default();
        let mut seen = HashSet::new();
        for input in &inputs {
            let is_new_in_batch = seen.insert((input.name.clone(), input.measurement_unit.clone()));
            let exists = !is_new_in_batch
                || self
                    .repo
                    .get_by_name_and_unit(&input.name, &input.measurement_unit)
                    .await
                    .context("Failed to check ingredient")?
                    .is_some();
            if exists {
                summary.skipped += 1;
                continue;
            }

            self.repo.create(input).await.context("Failed to create ingredient")?;
            summary.created += 1;
        }

        if summary.created > 0 {
            let _ = self.cache.delete(CACHE_KEY_ALL).await;
            let _ = self.cache.delete_pattern(&format!("{}*", CACHE_PREFIX_SEARCH)).await;
        }
        tracing::info!(created = summary.created, skipped = summary.skipped, "Ingredients imported");
        Ok(summary)
    }

    async fn all(&self) -> Result<Vec<Ingredient>, IngredientServiceError> {
        if let Some(all) = self.cache.get::<Vec<Ingredient>>(CACHE_KEY_ALL).await.ok().flatten() {
            return Ok(all);
        }

        let all = self.repo.list().await.context("Failed to list ingredients")?;
        let _ = self.cache.set(CACHE_KEY_ALL, &all, self.cache.default_ttl()).await;
        Ok(all)
    }
}

fn check_length(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    if value.is_empty() {
        errors.add(field, "This field is required.");
    } else if value.chars().count() > max {
        errors.add(field, format!("Ensure this field has no more than {} characters.", max));
    }
}
