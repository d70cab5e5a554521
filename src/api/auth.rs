//! Authentication API endpoints
//!
//! Handles HTTP requests for token authentication:
//! - POST /api/auth/token/login/ - Exchange email and password for a token
//! - POST /api/auth/token/logout/ - Revoke the token used for the request

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{extract_token, ApiError, AppState, AuthenticatedUser, JsonBody};
use crate::services::LoginInput;

/// Request body for token login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Response for successful login
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub auth_token: String,
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new().route("/auth/token/login/", post(login))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/auth/token/logout/", post(logout))
}

/// POST /api/auth/token/login/
async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state
        .user_service
        .login(LoginInput::new(body.email, body.password))
        .await?;

    Ok(Json(TokenResponse {
        auth_token: token.token,
    }))
}

/// POST /api/auth/token/logout/
async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = extract_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided."))?;

    state.user_service.logout(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}
