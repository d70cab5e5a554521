//! Shopping list service
//!
//! Aggregates the ingredients of every recipe in a user's cart and renders
//! the result as a plain-text or CSV download.

use crate::db::repositories::CollectionRepository;
use crate::models::{ShoppingList, User};
use anyhow::Context;
use chrono::{NaiveDate, Utc};
use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

/// Recipe names longer than this are cut in the text rendering
pub const MAX_RECIPE_NAME_CHARS: usize = 50;

const DATE_FORMAT: &str = "%d.%m.%Y";

/// Error types for shopping list operations
#[derive(Debug, thiserror::Error)]
pub enum ShoppingListError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Download format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShoppingListFormat {
    #[default]
    Text,
    Csv,
}

impl ShoppingListFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ShoppingListFormat::Text => "text/plain; charset=utf-8",
            ShoppingListFormat::Csv => "text/csv; charset=utf-8",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ShoppingListFormat::Text => "txt",
            ShoppingListFormat::Csv => "csv",
        }
    }
}

impl FromStr for ShoppingListFormat {
    type Err = ShoppingListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(ShoppingListFormat::Text),
            "csv" => Ok(ShoppingListFormat::Csv),
            other => Err(ShoppingListError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Shopping list service
pub struct ShoppingListService {
    collections: Arc<dyn CollectionRepository>,
}

impl ShoppingListService {
    pub fn new(collections: Arc<dyn CollectionRepository>) -> Self {
        Self { collections }
    }

    /// Aggregate the user's cart, dated with today's UTC date
    pub async fn aggregate(&self, user: &User) -> Result<ShoppingList, ShoppingListError> {
        let items = self
            .collections
            .cart_items(user.id)
            .await
            .context("Failed to aggregate shopping cart")?;
        let recipes = self
            .collections
            .cart_recipes(user.id)
            .await
            .context("Failed to list cart recipes")?;

        Ok(ShoppingList {
            username: user.username.clone(),
            items,
            recipes,
            generated_on: Utc::now().date_naive(),
        })
    }

    /// Render in the requested format
    pub fn render(&self, list: &ShoppingList, format: ShoppingListFormat) -> String {
        match format {
            ShoppingListFormat::Text => render_text(list),
            ShoppingListFormat::Csv => render_csv(list),
        }
    }
}

/// Human-readable list: header, numbered products, then the recipes
pub fn render_text(list: &ShoppingList) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Shopping list for {} ({})",
        list.username,
        list.generated_on.format(DATE_FORMAT)
    );

    let _ = writeln!(out, "Products:");
    for (index, item) in list.items.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} - {} {}",
            index + 1,
            capitalize(&item.name),
            item.amount,
            item.measurement_unit
        );
    }

    let _ = writeln!(out, "Recipes:");
    for recipe in &list.recipes {
        let name: String = recipe.name.chars().take(MAX_RECIPE_NAME_CHARS).collect();
        let _ = writeln!(out, "- {} ({})", name, recipe.author_username);
    }

    out
}

/// `name,measurement_unit,amount` rows with RFC 4180 quoting
pub fn render_csv(list: &ShoppingList) -> String {
    let mut out = String::from("name,measurement_unit,amount\r\n");
    for item in &list.items {
        let _ = write!(
            out,
            "{},{},{}\r\n",
            csv_field(&item.name),
            csv_field(&item.measurement_unit),
            item.amount
        );
    }
    out
}

/// `shopping_list(dd.mm.YYYY).txt` or `.csv`
pub fn filename(date: NaiveDate, format: ShoppingListFormat) -> String {
    format!("shopping_list({}).{}", date.format(DATE_FORMAT), format.extension())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
