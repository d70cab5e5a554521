//! Short link redirect
//!
//! `GET /s/{slug}/` answers 302 with the recipe page of the frontend.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::api::middleware::{ApiError, AppState};

/// Build the redirect router, mounted outside `/api`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/s/{slug}/", get(redirect))
        .route("/s/{slug}", get(redirect))
}

async fn redirect(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let recipe_id = state.short_link_service.resolve(&slug).await?;
    let location = recipe_location(state.config.server.frontend_url.as_deref(), recipe_id);

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]))
}

/// `{frontend_url}/recipes/{id}/`, relative when no frontend URL is set
pub fn recipe_location(frontend_url: Option<&str>, recipe_id: i64) -> String {
    let base = frontend_url.unwrap_or_default().trim_end_matches('/');
    format!("{}/recipes/{}/", base, recipe_id)
}
