//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for one entity and hides the
//! SQLite/MySQL split behind an async trait.

pub mod collection;
pub mod follow;
pub mod ingredient;
pub mod recipe;
pub mod short_link;
pub mod tag;
pub mod token;
pub mod user;

pub use collection::{CollectionKind, CollectionRepository, SqlxCollectionRepository};
pub use follow::{FollowRepository, SqlxFollowRepository};
pub use ingredient::{IngredientRepository, SqlxIngredientRepository};
pub use recipe::{RecipeRepository, SqlxRecipeRepository};
pub use short_link::{ShortLinkRepository, SqlxShortLinkRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use token::{SqlxTokenRepository, TokenRepository};
pub use user::{SqlxUserRepository, UserRepository};

use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};

/// `?, ?, ?` for an `IN (...)` list of `n` values
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// A value bound into a dynamically built query
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SqlArg {
    Int(i64),
    Text(String),
}

impl SqlArg {
    pub(crate) fn bind_sqlite<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            SqlArg::Int(v) => query.bind(*v),
            SqlArg::Text(v) => query.bind(v.as_str()),
        }
    }

    pub(crate) fn bind_mysql<'q>(
        &'q self,
        query: Query<'q, MySql, MySqlArguments>,
    ) -> Query<'q, MySql, MySqlArguments> {
        match self {
            SqlArg::Int(v) => query.bind(*v),
            SqlArg::Text(v) => query.bind(v.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(0), "");
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
