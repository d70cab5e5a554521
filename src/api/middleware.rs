//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error type and its mapping from service errors
//! - A JSON body extractor that rejects with that error type
//! - Token authentication (`Authorization: Token <t>` or `Bearer <t>`)
//! - Admin authorization

use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::Cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxCollectionRepository, SqlxFollowRepository, SqlxIngredientRepository, SqlxRecipeRepository,
    SqlxShortLinkRepository, SqlxTagRepository, SqlxTokenRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    CollectionService, CollectionServiceError, FieldErrors, IngredientService, IngredientServiceError,
    RecipeService, RecipeServiceError, ShoppingListError, ShoppingListService, ShortLinkService,
    ShortLinkServiceError, SubscriptionService, SubscriptionServiceError, TagService, TagServiceError,
    UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub config: Arc<Config>,
    pub cache: Arc<Cache>,
    pub user_service: Arc<UserService>,
    pub tag_service: Arc<TagService>,
    pub ingredient_service: Arc<IngredientService>,
    pub recipe_service: Arc<RecipeService>,
    pub collection_service: Arc<CollectionService>,
    pub shopping_list_service: Arc<ShoppingListService>,
    pub subscription_service: Arc<SubscriptionService>,
    pub short_link_service: Arc<ShortLinkService>,
}

impl AppState {
    /// Wire repositories and services over one pool and cache
    pub fn new(pool: DynDatabasePool, cache: Arc<Cache>, config: Config) -> Self {
        let users = SqlxUserRepository::boxed(pool.clone());
        let tokens = SqlxTokenRepository::boxed(pool.clone());
        let follows = SqlxFollowRepository::boxed(pool.clone());
        let tags = SqlxTagRepository::boxed(pool.clone());
        let ingredients = SqlxIngredientRepository::boxed(pool.clone());
        let recipes = SqlxRecipeRepository::boxed(pool.clone());
        let collections = SqlxCollectionRepository::boxed(pool.clone());
        let links = SqlxShortLinkRepository::boxed(pool.clone());

        let user_service = UserService::with_token_expiration(
            users.clone(),
            tokens,
            follows.clone(),
            config.auth.token_expiration_days,
        );
        let recipe_service = RecipeService::new(
            recipes.clone(),
            tags.clone(),
            ingredients.clone(),
            users.clone(),
            follows.clone(),
            collections.clone(),
            cache.clone(),
        );

        Self {
            user_service: Arc::new(user_service),
            tag_service: Arc::new(TagService::new(tags, cache.clone())),
            ingredient_service: Arc::new(IngredientService::new(ingredients, cache.clone())),
            recipe_service: Arc::new(recipe_service),
            collection_service: Arc::new(CollectionService::new(recipes.clone(), collections.clone())),
            shopping_list_service: Arc::new(ShoppingListService::new(collections)),
            subscription_service: Arc::new(SubscriptionService::new(users, follows, recipes.clone())),
            short_link_service: Arc::new(ShortLinkService::new(
                links,
                recipes,
                cache.clone(),
                config.short_link.length,
            )),
            pool,
            cache,
            config: Arc::new(config),
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// The requesting user when a valid token was sent
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided."))
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<AuthenticatedUser>().map(|u| u.0.clone())))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Validation error carrying per-field messages in `details`
    pub fn fields(code: &str, errors: &FieldErrors) -> Self {
        let details = serde_json::to_value(errors).unwrap_or_default();
        Self::with_details(code, errors.to_string(), details)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" | "CONFLICT" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn internal(e: anyhow::Error) -> Self {
        tracing::error!("Request failed: {:#}", e);
        Self::internal_error("Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// JSON request body; malformed input answers 400 with the error envelope
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let (field, message) = match &rejection {
            JsonRejection::JsonDataError(e) => split_data_error(&e.body_text()),
            _ => ("non_field_errors".to_string(), rejection.body_text()),
        };
        ApiError::fields("VALIDATION_ERROR", &FieldErrors::single(&field, message))
    }
}

/// Split axum's data error text into the serde path and the message.
/// Errors at the document root go under `non_field_errors`.
fn split_data_error(text: &str) -> (String, String) {
    let detail = text.split_once("target type: ").map_or(text, |(_, rest)| rest);
    let detail = detail.rsplit_once(" at line ").map_or(detail, |(head, _)| head);

    match detail.split_once(": ") {
        Some((path, message)) if !path.is_empty() && !path.contains(' ') => {
            (path.to_string(), message.to_string())
        }
        _ => ("non_field_errors".to_string(), detail.to_string()),
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(errors) => ApiError::fields("VALIDATION_ERROR", &errors),
            UserServiceError::Conflict(errors) => ApiError::fields("CONFLICT", &errors),
            UserServiceError::NotFound(msg) => ApiError::not_found(msg),
            UserServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(e: TagServiceError) -> Self {
        match e {
            TagServiceError::NotFound(msg) => ApiError::not_found(msg),
            TagServiceError::ValidationError(errors) => ApiError::fields("VALIDATION_ERROR", &errors),
            TagServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<IngredientServiceError> for ApiError {
    fn from(e: IngredientServiceError) -> Self {
        match e {
            IngredientServiceError::NotFound(msg) => ApiError::not_found(msg),
            IngredientServiceError::ValidationError(errors) => ApiError::fields("VALIDATION_ERROR", &errors),
            IngredientServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<RecipeServiceError> for ApiError {
    fn from(e: RecipeServiceError) -> Self {
        match e {
            RecipeServiceError::NotFound(msg) => ApiError::not_found(msg),
            RecipeServiceError::ValidationError(errors) => ApiError::fields("VALIDATION_ERROR", &errors),
            RecipeServiceError::PermissionDenied(msg) => ApiError::forbidden(msg),
            RecipeServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<CollectionServiceError> for ApiError {
    fn from(e: CollectionServiceError) -> Self {
        match e {
            CollectionServiceError::NotFound(msg) => ApiError::not_found(msg),
            CollectionServiceError::Conflict(msg) => ApiError::conflict(msg),
            CollectionServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<SubscriptionServiceError> for ApiError {
    fn from(e: SubscriptionServiceError) -> Self {
        match e {
            SubscriptionServiceError::NotFound(msg) => ApiError::not_found(msg),
            SubscriptionServiceError::Conflict(msg) => ApiError::conflict(msg),
            SubscriptionServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<ShortLinkServiceError> for ApiError {
    fn from(e: ShortLinkServiceError) -> Self {
        match e {
            ShortLinkServiceError::NotFound(msg) => ApiError::not_found(msg),
            ShortLinkServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<ShoppingListError> for ApiError {
    fn from(e: ShoppingListError) -> Self {
        match e {
            ShoppingListError::UnsupportedFormat(format) => ApiError::fields(
                "VALIDATION_ERROR",
                &FieldErrors::single("format", format!("Unsupported format: {}", format)),
            ),
            ShoppingListError::InternalError(e) => ApiError::internal(e),
        }
    }
}

/// Extract the auth token from the `Authorization` header
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Token ")
        .or_else(|| value.strip_prefix("Bearer "))?
        .trim();

    (!token.is_empty()).then(|| token.to_string())
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided."))?;

    let user = state
        .user_service
        .validate_token(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid token."))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Optional authentication middleware
///
/// Attaches the user when the token is valid; anything else continues as
/// an anonymous request.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_token(request.headers()) {
        match state.user_service.validate_token(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Token validation failed: {}", e),
        }
    }
    next.run(request).await
}

/// Admin authorization middleware
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided."))?;

    if !user.0.is_admin() {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_extract_token_schemes() {
        assert_eq!(extract_token(&headers_with("Token abc")), Some("abc".to_string()));
        assert_eq!(extract_token(&headers_with("Bearer xyz")), Some("xyz".to_string()));
        assert!(extract_token(&headers_with("Basic dXNlcg==")).is_none());
        assert!(extract_token(&headers_with("Token ")).is_none());
        assert!(extract_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::validation_error("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::conflict("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::internal_error("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::new("SOMETHING_ELSE", "x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_split_data_error() {
        let (field, message) = split_data_error(
            "Failed to deserialize the JSON body into the target type: cooking_time: invalid type: string \"abc\", expected i32 at line 1 column 21",
        );
        assert_eq!(field, "cooking_time");
        assert_eq!(message, "invalid type: string \"abc\", expected i32");

        let (field, message) = split_data_error(
            "Failed to deserialize the JSON body into the target type: ingredients[0]: missing field `amount` at line 1 column 30",
        );
        assert_eq!(field, "ingredients[0]");
        assert_eq!(message, "missing field `amount`");

        let (field, _) = split_data_error(
            "Failed to deserialize the JSON body into the target type: invalid type: integer `5`, expected a map at line 1 column 1",
        );
        assert_eq!(field, "non_field_errors");
    }

    #[test]
    fn test_field_errors_become_details() {
        let mut errors = FieldErrors::new();
        errors.add("email", "Enter a valid email address.");
        errors.add("username", "This field is required.");

        let error = ApiError::from(UserServiceError::ValidationError(errors));
        assert_eq!(error.error.code, "VALIDATION_ERROR");
        let details = error.error.details.unwrap();
        assert_eq!(details["email"][0], "Enter a valid email address.");
        assert_eq!(details["username"][0], "This field is required.");
    }

    #[test]
    fn test_service_error_codes() {
        assert_eq!(
            ApiError::from(RecipeServiceError::PermissionDenied("no".into())).error.code,
            "FORBIDDEN"
        );
        assert_eq!(
            ApiError::from(CollectionServiceError::Conflict("dup".into())).error.code,
            "CONFLICT"
        );
        assert_eq!(
            ApiError::from(UserServiceError::AuthenticationError("bad".into())).error.code,
            "UNAUTHORIZED"
        );

        let internal = ApiError::from(TagServiceError::InternalError(anyhow::anyhow!("db down")));
        assert_eq!(internal.error.code, "INTERNAL_ERROR");
        assert!(!internal.error.message.contains("db down"));
    }

    #[tokio::test]
    async fn test_require_admin_without_user() {
        let app = Router::new()
            .route("/admin", get(|| async { "ok" }))
            .route_layer(middleware::from_fn(require_admin));

        let response = app
            .oneshot(HttpRequest::builder().uri("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn prop_token_round_trips_through_header(token in "[A-Za-z0-9-]{1,40}", bearer in any::<bool>()) {
            let scheme = if bearer { "Bearer" } else { "Token" };
            let mut headers = HeaderMap::new();
            headers.insert(header::AUTHORIZATION, format!("{} {}", scheme, token).parse().unwrap());
            prop_assert_eq!(extract_token(&headers), Some(token));
        }

        #[test]
        fn prop_unknown_codes_are_server_errors(code in "[A-Z_]{3,20}") {
            let known = ["UNAUTHORIZED", "FORBIDDEN", "NOT_FOUND", "VALIDATION_ERROR", "CONFLICT"];
            prop_assume!(!known.contains(&code.as_str()));
            prop_assert_eq!(ApiError::new(code, "x").status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
