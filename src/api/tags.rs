//! Tag API endpoints
//!
//! - GET /api/tags/ - All tags, ordered by name
//! - GET /api/tags/{id}/ - A single tag

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::Tag;

/// Build the tags router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags/", get(list_tags))
        .route("/tags/{id}/", get(get_tag))
}

/// GET /api/tags/
async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.tag_service.list().await?))
}

/// GET /api/tags/{id}/
async fn get_tag(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Tag>, ApiError> {
    Ok(Json(state.tag_service.get(id).await?))
}
