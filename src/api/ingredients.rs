//! Ingredient API endpoints
//!
//! - GET /api/ingredients/?name=<prefix> - Ingredients, optionally filtered
//! - GET /api/ingredients/{id}/ - A single ingredient

use axum::{
    extract::{Path, RawQuery, State},
    routing::get,
    Json, Router,
};

use crate::api::common::QueryPairs;
use crate::api::middleware::{ApiError, AppState};
use crate::models::Ingredient;

/// Build the ingredients router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ingredients/", get(list_ingredients))
        .route("/ingredients/{id}/", get(get_ingredient))
}

/// GET /api/ingredients/
async fn list_ingredients(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    let query = QueryPairs::parse(raw.as_deref());
    Ok(Json(state.ingredient_service.list(query.get("name")).await?))
}

/// GET /api/ingredients/{id}/
async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Ingredient>, ApiError> {
    Ok(Json(state.ingredient_service.get(id).await?))
}
