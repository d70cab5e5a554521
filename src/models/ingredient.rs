//! Ingredient model

use serde::{Deserialize, Serialize};

/// An ingredient with its measurement unit.
///
/// The same name may appear with different units ("sugar, g" and
/// "sugar, tbsp"); the pair is unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

/// Input for creating an ingredient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIngredientInput {
    pub name: String,
    pub measurement_unit: String,
}
