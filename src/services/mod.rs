//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They
//! validate input, enforce permissions, assemble viewer-specific views and
//! keep the cache in step with writes.

pub mod collection;
pub mod ingredient;
pub mod password;
pub mod recipe;
pub mod shopping_list;
pub mod short_link;
pub mod subscription;
pub mod tag;
pub mod user;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub use collection::{CollectionService, CollectionServiceError};
pub use ingredient::{IngredientService, IngredientServiceError};
pub use password::{hash_password, verify_password};
pub use recipe::{RecipeQuery, RecipeService, RecipeServiceError};
pub use shopping_list::{ShoppingListError, ShoppingListFormat, ShoppingListService};
pub use short_link::{generate_slug, ShortLinkService, ShortLinkServiceError};
pub use subscription::{SubscriptionService, SubscriptionServiceError};
pub use tag::{TagService, TagServiceError};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};

/// Field-level validation messages, keyed by input field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors with a single message for one field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Outcome of a bulk reference-data import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub skipped: usize,
}
