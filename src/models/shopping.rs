//! Shopping list model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One aggregated line of a shopping list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    /// Sum of the amounts across every recipe in the cart
    pub amount: i64,
}

/// A recipe in the cart, with its author's username
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartRecipe {
    pub id: i64,
    pub name: String,
    pub author_username: String,
}

/// Aggregated shopping list for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingList {
    pub username: String,
    /// Ordered by name, then unit
    pub items: Vec<ShoppingListItem>,
    /// Ordered by recipe name
    pub recipes: Vec<CartRecipe>,
    pub generated_on: NaiveDate,
}

impl ShoppingList {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
