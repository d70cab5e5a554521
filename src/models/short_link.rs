//! Short link model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mapping from a short random slug to a recipe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShortLink {
    /// Base62 slug (unique)
    pub slug: String,
    /// Recipe id (one slug per recipe)
    pub recipe_id: i64,
    pub created_at: DateTime<Utc>,
}
