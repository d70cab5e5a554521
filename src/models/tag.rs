//! Tag model
//!
//! Tags ("Breakfast", "Dinner", ...) are reference data loaded by
//! `load-data` and attached to recipes.

use serde::{Deserialize, Serialize};

/// A recipe tag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    /// Display name (unique)
    pub name: String,
    /// URL-friendly slug (unique), used by the recipe `tags` filter
    pub slug: String,
}

/// Input for creating a tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTagInput {
    pub name: String,
    pub slug: String,
}
