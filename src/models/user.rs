//! User model
//!
//! Users publish recipes, keep favorites and a shopping cart, and follow
//! other authors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Email address (unique, used for login)
    pub email: String,
    /// Username (unique)
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Avatar image as submitted (data URI or URL)
    pub avatar: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Check if the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Check if the user is a moderator (or higher)
    pub fn is_moderator(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::Moderator)
    }

    /// Moderators and admins can edit any recipe; everyone else only their own.
    pub fn can_edit(&self, author_id: i64) -> bool {
        self.is_moderator() || self.id == author_id
    }
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular user - manages own recipes
    #[default]
    User,
    /// Moderator - can edit and delete any recipe
    Moderator,
    /// Administrator - moderator rights plus admin endpoints
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Moderator => write!(f, "moderator"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(UserRole::User),
            "moderator" => Ok(UserRole::Moderator),
            "admin" => Ok(UserRole::Admin),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Input for creating a new user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// A user as seen by a particular viewer
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user: User,
    /// Whether the viewer follows this user. Always false for anonymous
    /// viewers and for the user themselves.
    pub is_subscribed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_role(id: i64, role: UserRole) -> User {
        User {
            id,
            email: format!("user{}@example.com", id),
            username: format!("user{}", id),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password_hash: "hash".to_string(),
            avatar: None,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_permissions() {
        let admin = user_with_role(1, UserRole::Admin);
        let moderator = user_with_role(2, UserRole::Moderator);
        let user = user_with_role(3, UserRole::User);

        assert!(admin.is_admin() && admin.is_moderator());
        assert!(!moderator.is_admin() && moderator.is_moderator());
        assert!(!user.is_admin() && !user.is_moderator());

        assert!(admin.can_edit(99));
        assert!(moderator.can_edit(99));
        assert!(user.can_edit(3));
        assert!(!user.can_edit(99));
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [UserRole::User, UserRole::Moderator, UserRole::Admin] {
            assert_eq!(role.to_string().parse::<UserRole>().unwrap(), role);
        }
        assert_eq!("ADMIN".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("author".parse::<UserRole>().is_err());
        assert_eq!(UserRole::default(), UserRole::User);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = user_with_role(1, UserRole::User);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "user");
    }
}
