//! API layer - HTTP handlers and routing
//!
//! All JSON endpoints live under `/api`:
//! - Token login/logout
//! - Users, avatars and subscriptions
//! - Tags and ingredients (read-only)
//! - Recipes, favorites, shopping cart and shopping list download
//! - Admin cache maintenance
//!
//! Short link redirects (`/s/{slug}/`) sit outside `/api`.

pub mod admin;
pub mod auth;
pub mod common;
pub mod ingredients;
pub mod middleware;
pub mod recipes;
pub mod responses;
pub mod short_links;
pub mod tags;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser, JsonBody, MaybeUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = admin::router()
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need a valid token)
    let protected_routes = Router::new()
        .merge(auth::protected_router())
        .merge(users::protected_router())
        .merge(recipes::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes, personalised when a token is sent
    Router::new()
        .merge(auth::public_router())
        .merge(users::public_router())
        .merge(tags::router())
        .merge(ingredients::router())
        .merge(recipes::public_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_auth,
        ))
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => tracing::warn!(cors_origin, "Ignoring invalid CORS origin"),
    }

    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .merge(short_links::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::cache::create_test_cache;
    use crate::config::Config;
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreateIngredientInput, CreateTagInput};
    use axum::http::HeaderValue;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    /// Tag and ingredient IDs created by `seed_reference_data`
    pub struct ReferenceData {
        /// breakfast, dinner
        pub tags: Vec<i64>,
        /// egg (pcs), flour (g), milk (ml)
        pub ingredients: Vec<i64>,
    }

    pub async fn test_server() -> (TestServer, AppState) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let config = Config::default();
        let cors_origin = config.server.cors_origin.clone();
        let state = AppState::new(pool, create_test_cache(), config);
        let server = TestServer::new(build_router(state.clone(), &cors_origin)).expect("Failed to start test server");
        (server, state)
    }

    /// Register `{name}@example.com` with password `s3cret-pass` and log in
    pub async fn signup(server: &TestServer, name: &str) -> String {
        let email = format!("{}@example.com", name);
        server
            .post("/api/users/")
            .json(&json!({
                "email": email,
                "username": name,
                "first_name": "Test",
                "last_name": "User",
                "password": "s3cret-pass"
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let body: Value = server
            .post("/api/auth/token/login/")
            .json(&json!({"email": email, "password": "s3cret-pass"}))
            .await
            .json();
        body["auth_token"].as_str().expect("token in login response").to_string()
    }

    pub fn auth_header(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Token {}", token)).expect("valid header")
    }

    pub async fn seed_reference_data(state: &AppState) -> ReferenceData {
        state
            .tag_service
            .import(vec![
                CreateTagInput { name: "Breakfast".to_string(), slug: "breakfast".to_string() },
                CreateTagInput { name: "Dinner".to_string(), slug: "dinner".to_string() },
            ])
            .await
            .expect("Failed to import tags");
        state
            .ingredient_service
            .import(vec![
                CreateIngredientInput { name: "egg".to_string(), measurement_unit: "pcs".to_string() },
                CreateIngredientInput { name: "flour".to_string(), measurement_unit: "g".to_string() },
                CreateIngredientInput { name: "milk".to_string(), measurement_unit: "ml".to_string() },
            ])
            .await
            .expect("Failed to import ingredients");

        let tags = state.tag_service.list().await.expect("tags").into_iter().map(|t| t.id).collect();
        let ingredients = state
            .ingredient_service
            .list(None)
            .await
            .expect("ingredients")
            .into_iter()
            .map(|i| i.id)
            .collect();
        ReferenceData { tags, ingredients }
    }
}
