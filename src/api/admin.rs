//! Admin API endpoints
//!
//! - POST /api/admin/cache/clear - Drop every cached entry

use axum::{extract::State, http::StatusCode, routing::post, Router};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::cache::CacheLayer;

/// Build the admin router (requires auth and admin middleware)
pub fn router() -> Router<AppState> {
    Router::new().route("/admin/cache/clear", post(clear_cache))
}

/// POST /api/admin/cache/clear
async fn clear_cache(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    state
        .cache
        .clear()
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to clear cache: {}", e)))?;

    tracing::info!(user_id = user.id, "Cache cleared");
    Ok(StatusCode::NO_CONTENT)
}
