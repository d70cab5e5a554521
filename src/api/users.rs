//! User API endpoints
//!
//! - GET/POST /api/users/ - List users, register
//! - GET /api/users/{id}/ - User profile
//! - GET /api/users/me/ - Current user
//! - POST /api/users/set_password/ - Change password
//! - PUT/DELETE /api/users/me/avatar/ - Manage avatar
//! - GET /api/users/subscriptions/ - Followed authors
//! - POST/DELETE /api/users/{id}/subscribe/ - Follow or unfollow an author

use axum::{
    extract::{OriginalUri, Path, RawQuery, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{base_url, Paginated, QueryPairs};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, JsonBody, MaybeUser};
use crate::api::responses::{AuthorCardResponse, CreatedUserResponse, UserResponse};
use crate::services::RegisterInput;

/// Request body for registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for password change
#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub current_password: String,
}

/// Avatar as a data URI or URL
#[derive(Debug, Serialize, Deserialize)]
pub struct AvatarBody {
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Build public user routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/users/", get(list_users).post(register))
        .route("/users/{id}/", get(get_user))
}

/// Build protected user routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/users/me/", get(me))
        .route("/users/set_password/", post(set_password))
        .route("/users/me/avatar/", put(set_avatar).delete(delete_avatar))
        .route("/users/subscriptions/", get(subscriptions))
        .route("/users/{id}/subscribe/", post(subscribe).delete(unsubscribe))
}

/// GET /api/users/
async fn list_users(
    State(state): State<AppState>,
    viewer: MaybeUser,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    RawQuery(raw): RawQuery,
) -> Result<Json<Paginated<UserResponse>>, ApiError> {
    let params = QueryPairs::parse(raw.as_deref()).list_params(&state.config.pagination);
    let page = state.user_service.list(&params, viewer.user()).await?;

    let base = base_url(&headers, &state.config.server);
    Ok(Json(Paginated::new(page.map(UserResponse::from), &base, &uri)))
}

/// POST /api/users/
async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<CreatedUserResponse>), ApiError> {
    let user = state
        .user_service
        .register(RegisterInput {
            email: body.email,
            username: body.username,
            first_name: body.first_name,
            last_name: body.last_name,
            password: body.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /api/users/{id}/
async fn get_user(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let profile = state.user_service.profile(id, viewer.user()).await?;
    Ok(Json(profile.into()))
}

/// GET /api/users/me/
async fn me(AuthenticatedUser(user): AuthenticatedUser) -> Json<UserResponse> {
    Json(UserResponse::new(user, false))
}

/// POST /api/users/set_password/
async fn set_password(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    JsonBody(body): JsonBody<SetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .user_service
        .set_password(&user, &body.current_password, &body.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/users/me/avatar/
async fn set_avatar(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    JsonBody(body): JsonBody<AvatarBody>,
) -> Result<Json<AvatarBody>, ApiError> {
    let updated = state
        .user_service
        .set_avatar(user.id, body.avatar.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(AvatarBody { avatar: updated.avatar }))
}

/// DELETE /api/users/me/avatar/
async fn delete_avatar(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    state.user_service.delete_avatar(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/subscriptions/
async fn subscriptions(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    RawQuery(raw): RawQuery,
) -> Result<Json<Paginated<AuthorCardResponse>>, ApiError> {
    let query = QueryPairs::parse(raw.as_deref());
    let params = query.list_params(&state.config.pagination);
    let page = state
        .subscription_service
        .list(&user, &params, recipes_limit(&query))
        .await?;

    let base = base_url(&headers, &state.config.server);
    Ok(Json(Paginated::new(page.map(AuthorCardResponse::from), &base, &uri)))
}

/// POST /api/users/{id}/subscribe/
async fn subscribe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    RawQuery(raw): RawQuery,
) -> Result<(StatusCode, Json<AuthorCardResponse>), ApiError> {
    let query = QueryPairs::parse(raw.as_deref());
    let card = state
        .subscription_service
        .subscribe(&user, id, recipes_limit(&query))
        .await?;
    Ok((StatusCode::CREATED, Json(card.into())))
}

/// DELETE /api/users/{id}/subscribe/
async fn unsubscribe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.subscription_service.unsubscribe(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Non-negative `recipes_limit`; anything else means no limit
fn recipes_limit(query: &QueryPairs) -> Option<i64> {
    query.number::<i64>("recipes_limit").filter(|n| *n >= 0)
}
