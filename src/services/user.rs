//! User service
//!
//! Implements business logic for user management:
//! - Registration with field validation
//! - Token login and logout
//! - Token validation and periodic cleanup of expired tokens
//! - Profiles with the viewer's subscription flag
//! - Password change and avatar management

use crate::db::repositories::{FollowRepository, TokenRepository, UserRepository};
use crate::models::{AuthToken, CreateUserInput, ListParams, PagedResult, User, UserProfile, UserRole};
use crate::services::password::{hash_password, verify_password};
use crate::services::FieldErrors;
use anyhow::Context;
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use uuid::Uuid;

/// Default token lifetime in days
const DEFAULT_TOKEN_EXPIRATION_DAYS: i64 = 7;

pub const MAX_NAME_LENGTH: usize = 150;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Username reserved for the `/users/me/` route
const RESERVED_USERNAME: &str = "me";

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    /// Email or username already taken
    #[error("User already exists: {0}")]
    Conflict(FieldErrors),

    /// User not found
    #[error("User not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Registration input
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Login input
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    token_repo: Arc<dyn TokenRepository>,
    follow_repo: Arc<dyn FollowRepository>,
    token_expiration_days: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        token_repo: Arc<dyn TokenRepository>,
        follow_repo: Arc<dyn FollowRepository>,
    ) -> Self {
        Self::with_token_expiration(user_repo, token_repo, follow_repo, DEFAULT_TOKEN_EXPIRATION_DAYS)
    }

    /// Create a user service with a custom token lifetime
    pub fn with_token_expiration(
        user_repo: Arc<dyn UserRepository>,
        token_repo: Arc<dyn TokenRepository>,
        follow_repo: Arc<dyn FollowRepository>,
        token_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            follow_repo,
            token_expiration_days,
        }
    }

    /// Register a new user with the default role
    ///
    /// # Errors
    ///
    /// - `ValidationError` with one entry per invalid field
    /// - `Conflict` if the email or username is taken
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let input = RegisterInput {
            email: input.email.trim().to_string(),
            username: input.username.trim().to_string(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            password: input.password,
        };
        validate_register_input(&input).map_err(UserServiceError::ValidationError)?;

        let mut conflicts = FieldErrors::new();
        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            conflicts.add("email", "A user with this email already exists.");
        }
        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            conflicts.add("username", "A user with this username already exists.");
        }
        conflicts.into_result().map_err(UserServiceError::Conflict)?;

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let user = self
            .user_repo
            .create(&CreateUserInput {
                email: input.email,
                username: input.username,
                first_name: input.first_name,
                last_name: input.last_name,
                password_hash,
                role: UserRole::User,
            })
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Exchange email and password for a new auth token
    pub async fn login(&self, input: LoginInput) -> Result<AuthToken, UserServiceError> {
        let invalid = || {
            UserServiceError::AuthenticationError("Unable to log in with provided credentials.".to_string())
        };

        let user = self
            .user_repo
            .get_by_email(input.email.trim())
            .await
            .context("Failed to get user by email")?
            .ok_or_else(invalid)?;

        let password_valid =
            verify_password(&input.password, &user.password_hash).context("Failed to verify password")?;
        if !password_valid {
            tracing::debug!(user_id = user.id, "Login rejected: wrong password");
            return Err(invalid());
        }

        let now = Utc::now();
        let token = AuthToken {
            token: Uuid::new_v4().to_string(),
            user_id: user.id,
            expires_at: now + Duration::days(self.token_expiration_days),
            created_at: now,
        };
        let token = self.token_repo.create(&token).await.context("Failed to create token")?;

        Ok(token)
    }

    /// Invalidate a token
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.token_repo.delete(token).await.context("Failed to delete token")?;
        Ok(())
    }

    /// Resolve a token to its user
    ///
    /// Returns `None` for unknown tokens. An expired token is deleted and
    /// also yields `None`.
    pub async fn validate_token(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let token = match self.token_repo.get(token).await.context("Failed to get token")? {
            Some(t) => t,
            None => return Ok(None),
        };

        if token.is_expired() {
            let _ = self.token_repo.delete(&token.token).await;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(token.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?
            .ok_or_else(|| UserServiceError::NotFound(format!("User {} not found", id)))
    }

    /// Get user by email
    pub async fn get_by_email(&self, email: &str) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_email(email.trim())
            .await
            .context("Failed to get user by email")?
            .ok_or_else(|| UserServiceError::NotFound(format!("User '{}' not found", email)))
    }

    /// A user as seen by `viewer`
    pub async fn profile(&self, id: i64, viewer: Option<&User>) -> Result<UserProfile, UserServiceError> {
        let user = self.get_by_id(id).await?;
        self.to_profile(user, viewer).await
    }

    /// Paginated users ordered by ID
    pub async fn list(
        &self,
        params: &ListParams,
        viewer: Option<&User>,
    ) -> Result<PagedResult<UserProfile>, UserServiceError> {
        let users = self.user_repo.list(params).await.context("Failed to list users")?;
        let total = self.user_repo.count().await.context("Failed to count users")?;

        let mut profiles = Vec::with_capacity(users.len());
        for user in users {
            profiles.push(self.to_profile(user, viewer).await?);
        }

        Ok(PagedResult::new(profiles, total, params))
    }

    /// Change a password after checking the current one
    pub async fn set_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), UserServiceError> {
        let mut errors = FieldErrors::new();
        if current_password.is_empty() {
            errors.add("current_password", "This field is required.");
        }
        validate_password("new_password", new_password, &mut errors);
        errors.into_result().map_err(UserServiceError::ValidationError)?;

        let valid = verify_password(current_password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            return Err(UserServiceError::ValidationError(FieldErrors::single(
                "current_password",
                "Wrong password.",
            )));
        }

        let hash = hash_password(new_password).context("Failed to hash password")?;
        self.user_repo
            .update_password(user.id, &hash)
            .await
            .context("Failed to update password")?;

        Ok(())
    }

    /// Store an avatar image string (data URI or URL)
    pub async fn set_avatar(&self, user_id: i64, avatar: &str) -> Result<User, UserServiceError> {
        let avatar = avatar.trim();
        if avatar.is_empty() {
            return Err(UserServiceError::ValidationError(FieldErrors::single(
                "avatar",
                "This field is required.",
            )));
        }

        self.user_repo
            .update_avatar(user_id, Some(avatar))
            .await
            .context("Failed to update avatar")?;
        self.get_by_id(user_id).await
    }

    /// Remove the avatar
    pub async fn delete_avatar(&self, user_id: i64) -> Result<(), UserServiceError> {
        self.user_repo
            .update_avatar(user_id, None)
            .await
            .context("Failed to delete avatar")?;
        Ok(())
    }

    /// Change a user's role
    pub async fn set_role(&self, user_id: i64, role: UserRole) -> Result<User, UserServiceError> {
        self.get_by_id(user_id).await?;
        self.user_repo
            .update_role(user_id, role)
            .await
            .context("Failed to update role")?;
        self.get_by_id(user_id).await
    }

    /// Delete all expired tokens, returning how many were removed
    pub async fn cleanup_expired_tokens(&self) -> Result<i64, UserServiceError> {
        let count = self
            .token_repo
            .delete_expired()
            .await
            .context("Failed to delete expired tokens")?;

        Ok(count)
    }

    async fn to_profile(&self, user: User, viewer: Option<&User>) -> Result<UserProfile, UserServiceError> {
        let is_subscribed = match viewer {
            Some(viewer) if viewer.id != user.id => self
                .follow_repo
                .exists(viewer.id, user.id)
                .await
                .context("Failed to check subscription")?,
            _ => false,
        };

        Ok(UserProfile { user, is_subscribed })
    }
}

// ============================================================================
// Validation
// ============================================================================

fn validate_register_input(input: &RegisterInput) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if input.email.is_empty() {
        errors.add("email", "This field is required.");
    } else if input.email.chars().count() > MAX_EMAIL_LENGTH {
        errors.add("email", format!("Ensure this field has no more than {} characters.", MAX_EMAIL_LENGTH));
    } else if !EMAIL_RE.is_match(&input.email) {
        errors.add("email", "Enter a valid email address.");
    }

    if input.username.is_empty() {
        errors.add("username", "This field is required.");
    } else {
        if input.username.chars().count() > MAX_NAME_LENGTH {
            errors.add("username", format!("Ensure this field has no more than {} characters.", MAX_NAME_LENGTH));
        }
        if !USERNAME_RE.is_match(&input.username) {
            errors.add("username", "Enter a valid username: letters, digits and @/./+/-/_ only.");
        }
        if input.username == RESERVED_USERNAME {
            errors.add("username", format!("The username '{}' is reserved.", RESERVED_USERNAME));
        }
    }

    for (field, value) in [("first_name", &input.first_name), ("last_name", &input.last_name)] {
        if value.is_empty() {
            errors.add(field, "This field is required.");
        } else if value.chars().count() > MAX_NAME_LENGTH {
            errors.add(field, format!("Ensure this field has no more than {} characters.", MAX_NAME_LENGTH));
        }
    }

    validate_password("password", &input.password, &mut errors);

    errors.into_result()
}

fn validate_password(field: &str, password: &str, errors: &mut FieldErrors) {
    if password.is_empty() {
        errors.add(field, "This field is required.");
    } else if password.chars().count() > MAX_PASSWORD_LENGTH {
        errors.add(field, format!("Ensure this field has no more than {} characters.", MAX_PASSWORD_LENGTH));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxFollowRepository, SqlxTokenRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup_test_service() -> (DynDatabasePool, UserService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let service = UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxTokenRepository::boxed(pool.clone()),
            SqlxFollowRepository::boxed(pool.clone()),
        );
        (pool, service)
    }

    fn register_input(username: &str) -> RegisterInput {
        RegisterInput {
            email: format!("{}@example.com", username),
            username: username.to_string(),
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
            password: "s3cret-pass".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_creates_plain_user() {
        let (_pool, service) = setup_test_service().await;
        let user = service.register(register_input("cook")).await.unwrap();

        assert_eq!(user.username, "cook");
        assert_eq!(user.role, UserRole::User);
        assert!(user.password_hash.starts_with("$argon2id$"));
        assert!(user.avatar.is_none());
    }

    #[tokio::test]
    async fn test_register_reports_every_invalid_field() {
        let (_pool, service) = setup_test_service().await;
        let input = RegisterInput {
            email: "not-an-email".to_string(),
            username: "bad name!".to_string(),
            first_name: "".to_string(),
            last_name: "x".repeat(151),
            password: "".to_string(),
        };

        match service.register(input).await {
            Err(UserServiceError::ValidationError(errors)) => {
                for field in ["email", "username", "first_name", "last_name", "password"] {
                    assert!(errors.contains(field), "missing error for {}", field);
                }
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_rejects_reserved_username() {
        let (_pool, service) = setup_test_service().await;
        let result = service.register(register_input("me")).await;
        assert!(matches!(result, Err(UserServiceError::ValidationError(e)) if e.contains("username")));
    }

    #[tokio::test]
    async fn test_register_duplicates_conflict() {
        let (_pool, service) = setup_test_service().await;
        service.register(register_input("cook")).await.unwrap();

        let mut same_email = register_input("other");
        same_email.email = "COOK@example.com".to_string();
        match service.register(same_email).await {
            Err(UserServiceError::Conflict(errors)) => {
                assert!(errors.contains("email"));
                assert!(!errors.contains("username"));
            }
            other => panic!("Expected conflict, got {:?}", other),
        }

        let mut same_username = register_input("cook");
        same_username.email = "new@example.com".to_string();
        assert!(matches!(
            service.register(same_username).await,
            Err(UserServiceError::Conflict(e)) if e.contains("username")
        ));
    }

    #[tokio::test]
    async fn test_login_validate_logout() {
        let (_pool, service) = setup_test_service().await;
        let user = service.register(register_input("cook")).await.unwrap();

        let token = service
            .login(LoginInput::new("cook@example.com", "s3cret-pass"))
            .await
            .unwrap();
        assert_eq!(token.user_id, user.id);

        let found = service.validate_token(&token.token).await.unwrap().expect("Token should be valid");
        assert_eq!(found.id, user.id);

        service.logout(&token.token).await.unwrap();
        assert!(service.validate_token(&token.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_wrong_credentials() {
        let (_pool, service) = setup_test_service().await;
        service.register(register_input("cook")).await.unwrap();

        assert!(matches!(
            service.login(LoginInput::new("cook@example.com", "wrong")).await,
            Err(UserServiceError::AuthenticationError(_))
        ));
        assert!(matches!(
            service.login(LoginInput::new("nobody@example.com", "s3cret-pass")).await,
            Err(UserServiceError::AuthenticationError(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_token_is_deleted_on_use() {
        let (pool, _) = setup_test_service().await;
        let service = UserService::with_token_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxTokenRepository::boxed(pool.clone()),
            SqlxFollowRepository::boxed(pool.clone()),
            -1,
        );
        service.register(register_input("cook")).await.unwrap();
        let token = service
            .login(LoginInput::new("cook@example.com", "s3cret-pass"))
            .await
            .unwrap();

        assert!(service.validate_token(&token.token).await.unwrap().is_none());
        let tokens = SqlxTokenRepository::new(pool);
        assert!(tokens.get(&token.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_expired_tokens() {
        let (pool, _) = setup_test_service().await;
        let service = UserService::with_token_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxTokenRepository::boxed(pool.clone()),
            SqlxFollowRepository::boxed(pool),
            -1,
        );
        service.register(register_input("cook")).await.unwrap();
        for _ in 0..2 {
            service.login(LoginInput::new("cook@example.com", "s3cret-pass")).await.unwrap();
        }

        assert_eq!(service.cleanup_expired_tokens().await.unwrap(), 2);
        assert_eq!(service.cleanup_expired_tokens().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_password() {
        let (_pool, service) = setup_test_service().await;
        let user = service.register(register_input("cook")).await.unwrap();

        assert!(matches!(
            service.set_password(&user, "nope", "new-pass").await,
            Err(UserServiceError::ValidationError(e)) if e.contains("current_password")
        ));
        assert!(matches!(
            service.set_password(&user, "s3cret-pass", "").await,
            Err(UserServiceError::ValidationError(e)) if e.contains("new_password")
        ));

        service.set_password(&user, "s3cret-pass", "new-pass").await.unwrap();
        assert!(service.login(LoginInput::new("cook@example.com", "new-pass")).await.is_ok());
        assert!(service.login(LoginInput::new("cook@example.com", "s3cret-pass")).await.is_err());
    }

    #[tokio::test]
    async fn test_avatar_set_and_delete() {
        let (_pool, service) = setup_test_service().await;
        let user = service.register(register_input("cook")).await.unwrap();

        assert!(matches!(
            service.set_avatar(user.id, "  ").await,
            Err(UserServiceError::ValidationError(_))
        ));

        let updated = service.set_avatar(user.id, "data:image/png;base64,iVBORw0KGgo=").await.unwrap();
        assert_eq!(updated.avatar.as_deref(), Some("data:image/png;base64,iVBORw0KGgo="));

        service.delete_avatar(user.id).await.unwrap();
        assert!(service.get_by_id(user.id).await.unwrap().avatar.is_none());
    }

    #[tokio::test]
    async fn test_profile_subscription_flag() {
        let (pool, service) = setup_test_service().await;
        let reader = service.register(register_input("reader")).await.unwrap();
        let author = service.register(register_input("author")).await.unwrap();

        assert!(!service.profile(author.id, Some(&reader)).await.unwrap().is_subscribed);
        SqlxFollowRepository::new(pool).follow(reader.id, author.id).await.unwrap();

        assert!(service.profile(author.id, Some(&reader)).await.unwrap().is_subscribed);
        assert!(!service.profile(author.id, None).await.unwrap().is_subscribed);
        assert!(!service.profile(reader.id, Some(&reader)).await.unwrap().is_subscribed);
        assert!(matches!(service.profile(999, None).await, Err(UserServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_paginated_by_id() {
        let (_pool, service) = setup_test_service().await;
        for name in ["a1", "b2", "c3"] {
            service.register(register_input(name)).await.unwrap();
        }

        let page = service.list(&ListParams::new(2, 0), None).await.unwrap();
        assert_eq!(page.total, 3);
        let names: Vec<&str> = page.items.iter().map(|p| p.user.username.as_str()).collect();
        assert_eq!(names, vec!["a1", "b2"]);
        assert_eq!(page.next_offset(), Some(2));
    }

    #[tokio::test]
    async fn test_set_role() {
        let (_pool, service) = setup_test_service().await;
        let user = service.register(register_input("cook")).await.unwrap();

        let promoted = service.set_role(user.id, UserRole::Moderator).await.unwrap();
        assert!(promoted.is_moderator());
        assert_eq!(service.get_by_email("cook@example.com").await.unwrap().id, user.id);
        assert!(matches!(
            service.set_role(999, UserRole::Admin).await,
            Err(UserServiceError::NotFound(_))
        ));
    }
}
