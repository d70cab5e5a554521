//! Recipe API endpoints
//!
//! - GET/POST /api/recipes/ - Filtered list, publish
//! - GET/PATCH/DELETE /api/recipes/{id}/ - Detail, edit, delete
//! - GET /api/recipes/{id}/get-link/ - Short link
//! - POST/DELETE /api/recipes/{id}/favorite/ - Favorites
//! - POST/DELETE /api/recipes/{id}/shopping_cart/ - Shopping cart
//! - GET /api/recipes/download_shopping_cart/ - Shopping list download

use axum::{
    extract::{OriginalUri, Path, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{base_url, Paginated, QueryPairs};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, JsonBody, MaybeUser};
use crate::api::responses::{RecipeResponse, ShortLinkResponse};
use crate::db::repositories::CollectionKind;
use crate::models::{CreateRecipeInput, IngredientAmount, RecipeShort, UpdateRecipeInput};
use crate::services::shopping_list::filename;
use crate::services::{RecipeQuery, ShoppingListFormat};

/// Request body for publishing or editing a recipe
#[derive(Debug, Default, Deserialize)]
pub struct RecipeRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub cooking_time: Option<i32>,
    #[serde(default)]
    pub tags: Option<Vec<i64>>,
    #[serde(default)]
    pub ingredients: Option<Vec<IngredientAmount>>,
}

impl From<RecipeRequest> for CreateRecipeInput {
    fn from(body: RecipeRequest) -> Self {
        Self {
            name: body.name.unwrap_or_default(),
            image: body.image.unwrap_or_default(),
            text: body.text.unwrap_or_default(),
            cooking_time: body.cooking_time.unwrap_or_default(),
            tags: body.tags.unwrap_or_default(),
            ingredients: body.ingredients.unwrap_or_default(),
        }
    }
}

impl From<RecipeRequest> for UpdateRecipeInput {
    fn from(body: RecipeRequest) -> Self {
        Self {
            name: body.name,
            image: body.image,
            text: body.text,
            cooking_time: body.cooking_time,
            tags: body.tags,
            ingredients: body.ingredients,
        }
    }
}

/// Build public recipe routes (optional auth)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/recipes/", get(list_recipes))
        .route("/recipes/{id}/", get(get_recipe))
        .route("/recipes/{id}/get-link/", get(get_link))
}

/// Build protected recipe routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/recipes/", post(create_recipe))
        .route("/recipes/{id}/", axum::routing::patch(update_recipe).delete(delete_recipe))
        .route("/recipes/{id}/favorite/", post(add_favorite).delete(remove_favorite))
        .route("/recipes/{id}/shopping_cart/", post(add_to_cart).delete(remove_from_cart))
        .route("/recipes/download_shopping_cart/", get(download_shopping_cart))
}

/// GET /api/recipes/
async fn list_recipes(
    State(state): State<AppState>,
    viewer: MaybeUser,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    RawQuery(raw): RawQuery,
) -> Result<Json<Paginated<RecipeResponse>>, ApiError> {
    let query = QueryPairs::parse(raw.as_deref());
    let params = query.list_params(&state.config.pagination);
    let filter = RecipeQuery {
        author: query.number("author"),
        tags: query.get_all("tags"),
        is_favorited: query.flag("is_favorited"),
        is_in_shopping_cart: query.flag("is_in_shopping_cart"),
    };

    let page = state.recipe_service.list(filter, viewer.user(), &params).await?;

    let base = base_url(&headers, &state.config.server);
    Ok(Json(Paginated::new(page.map(RecipeResponse::from), &base, &uri)))
}

/// POST /api/recipes/
async fn create_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    JsonBody(body): JsonBody<RecipeRequest>,
) -> Result<(StatusCode, Json<RecipeResponse>), ApiError> {
    let detail = state.recipe_service.create(&user, body.into()).await?;
    Ok((StatusCode::CREATED, Json(detail.into())))
}

/// GET /api/recipes/{id}/
async fn get_recipe(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<RecipeResponse>, ApiError> {
    let detail = state.recipe_service.get(id, viewer.user()).await?;
    Ok(Json(detail.into()))
}

/// PATCH /api/recipes/{id}/
async fn update_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<RecipeRequest>,
) -> Result<Json<RecipeResponse>, ApiError> {
    let detail = state.recipe_service.update(&user, id, body.into()).await?;
    Ok(Json(detail.into()))
}

/// DELETE /api/recipes/{id}/
async fn delete_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.recipe_service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/recipes/{id}/get-link/
async fn get_link(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ShortLinkResponse>, ApiError> {
    let link = state.short_link_service.get_or_create(id).await?;
    let base = base_url(&headers, &state.config.server);

    Ok(Json(ShortLinkResponse {
        short_link: format!("{}/s/{}/", base, link.slug),
    }))
}

/// POST /api/recipes/{id}/favorite/
async fn add_favorite(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<RecipeShort>), ApiError> {
    let short = state.collection_service.add(CollectionKind::Favorites, user.id, id).await?;
    Ok((StatusCode::CREATED, Json(short)))
}

/// DELETE /api/recipes/{id}/favorite/
async fn remove_favorite(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.collection_service.remove(CollectionKind::Favorites, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/recipes/{id}/shopping_cart/
async fn add_to_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<RecipeShort>), ApiError> {
    let short = state.collection_service.add(CollectionKind::ShoppingCart, user.id, id).await?;
    Ok((StatusCode::CREATED, Json(short)))
}

/// DELETE /api/recipes/{id}/shopping_cart/
async fn remove_from_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.collection_service.remove(CollectionKind::ShoppingCart, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/recipes/download_shopping_cart/
async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RawQuery(raw): RawQuery,
) -> Result<impl IntoResponse, ApiError> {
    let query = QueryPairs::parse(raw.as_deref());
    let format: ShoppingListFormat = match query.get("format") {
        Some(f) => f.parse()?,
        None => ShoppingListFormat::default(),
    };

    let list = state.shopping_list_service.aggregate(&user).await?;
    let body = state.shopping_list_service.render(&list, format);
    let disposition = format!("attachment; filename=\"{}\"", filename(list.generated_on, format));

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{auth_header, seed_reference_data, signup, test_server, ReferenceData};
    use axum::http::{header, StatusCode};
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn recipe_body(data: &ReferenceData, name: &str) -> Value {
        json!({
            "name": name,
            "image": "data:image/png;base64,AAAA",
            "text": "Mix and bake.",
            "cooking_time": 20,
            "tags": [data.tags[0]],
            "ingredients": [
                {"id": data.ingredients[0], "amount": 2},
                {"id": data.ingredients[1], "amount": 100}
            ]
        })
    }

    async fn publish(server: &TestServer, token: &str, body: &Value) -> Value {
        let response = server
            .post("/api/recipes/")
            .add_header(header::AUTHORIZATION, auth_header(token))
            .json(body)
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (server, state) = test_server().await;
        let data = seed_reference_data(&state).await;
        let token = signup(&server, "chef").await;

        let created = publish(&server, &token, &recipe_body(&data, "Pancakes")).await;
        assert_eq!(created["name"], "Pancakes");
        assert_eq!(created["author"]["username"], "chef");
        assert_eq!(created["tags"][0]["slug"], "breakfast");
        assert_eq!(created["ingredients"][1]["measurement_unit"], "g");
        assert_eq!(created["is_favorited"], false);

        let id = created["id"].as_i64().unwrap();
        let fetched: Value = server.get(&format!("/api/recipes/{}/", id)).await.json();
        assert_eq!(fetched["id"], id);
        assert_eq!(fetched["author"]["is_subscribed"], false);
    }

    #[tokio::test]
    async fn test_create_requires_auth_and_valid_body() {
        let (server, state) = test_server().await;
        let data = seed_reference_data(&state).await;

        server
            .post("/api/recipes/")
            .json(&recipe_body(&data, "Soup"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        let token = signup(&server, "chef").await;
        let response = server
            .post("/api/recipes/")
            .add_header(header::AUTHORIZATION, auth_header(&token))
            .json(&json!({"name": "Soup"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"]["details"].get("cooking_time").is_some());

        let mut unknown = recipe_body(&data, "Soup");
        unknown["ingredients"] = json!([{"id": 999, "amount": 1}]);
        server
            .post("/api/recipes/")
            .add_header(header::AUTHORIZATION, auth_header(&token))
            .json(&unknown)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let (server, state) = test_server().await;
        let data = seed_reference_data(&state).await;
        let token = signup(&server, "chef").await;

        let mut wrong_type = recipe_body(&data, "Soup");
        wrong_type["cooking_time"] = json!("abc");
        let response = server
            .post("/api/recipes/")
            .add_header(header::AUTHORIZATION, auth_header(&token))
            .json(&wrong_type)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["details"].get("cooking_time").is_some());

        let mut no_amount = recipe_body(&data, "Soup");
        no_amount["ingredients"] = json!([{"id": data.ingredients[0]}]);
        let response = server
            .post("/api/recipes/")
            .add_header(header::AUTHORIZATION, auth_header(&token))
            .json(&no_amount)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"]["details"].get("ingredients[0]").is_some());

        let response = server
            .post("/api/recipes/")
            .add_header(header::AUTHORIZATION, auth_header(&token))
            .text("{not json")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"]["details"].get("non_field_errors").is_some());
    }

    #[tokio::test]
    async fn test_only_author_may_edit() {
        let (server, state) = test_server().await;
        let data = seed_reference_data(&state).await;
        let chef = signup(&server, "chef").await;
        let other = signup(&server, "other").await;

        let created = publish(&server, &chef, &recipe_body(&data, "Stew")).await;
        let path = format!("/api/recipes/{}/", created["id"]);

        let mut patch = recipe_body(&data, "Better stew");
        patch["tags"] = json!([data.tags[1]]);
        server
            .patch(&path)
            .add_header(header::AUTHORIZATION, auth_header(&other))
            .json(&patch)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let updated: Value = server
            .patch(&path)
            .add_header(header::AUTHORIZATION, auth_header(&chef))
            .json(&patch)
            .await
            .json();
        assert_eq!(updated["name"], "Better stew");
        assert_eq!(updated["tags"][0]["slug"], "dinner");

        server
            .delete(&path)
            .add_header(header::AUTHORIZATION, auth_header(&other))
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .delete(&path)
            .add_header(header::AUTHORIZATION, auth_header(&chef))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server.get(&path).await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_filters_and_pagination() {
        let (server, state) = test_server().await;
        let data = seed_reference_data(&state).await;
        let chef = signup(&server, "chef").await;

        for name in ["One", "Two", "Three"] {
            publish(&server, &chef, &recipe_body(&data, name)).await;
        }
        let mut dinner = recipe_body(&data, "Four");
        dinner["tags"] = json!([data.tags[1]]);
        let dinner = publish(&server, &chef, &dinner).await;

        let page: Value = server.get("/api/recipes/?limit=2").await.json();
        assert_eq!(page["count"], 4);
        assert_eq!(page["results"][0]["name"], "Four");
        assert!(page["next"].as_str().unwrap().contains("offset=2"));

        let tagged: Value = server.get("/api/recipes/?tags=dinner").await.json();
        assert_eq!(tagged["count"], 1);
        let both: Value = server.get("/api/recipes/?tags=dinner&tags=breakfast").await.json();
        assert_eq!(both["count"], 4);

        let anonymous: Value = server.get("/api/recipes/?is_favorited=1").await.json();
        assert_eq!(anonymous["count"], 0);

        let path = format!("/api/recipes/{}/favorite/", dinner["id"]);
        server
            .post(&path)
            .add_header(header::AUTHORIZATION, auth_header(&chef))
            .await
            .assert_status(StatusCode::CREATED);
        let favorites: Value = server
            .get("/api/recipes/?is_favorited=1")
            .add_header(header::AUTHORIZATION, auth_header(&chef))
            .await
            .json();
        assert_eq!(favorites["count"], 1);
        assert_eq!(favorites["results"][0]["is_favorited"], true);
    }

    #[tokio::test]
    async fn test_collections_and_download() {
        let (server, state) = test_server().await;
        let data = seed_reference_data(&state).await;
        let chef = signup(&server, "chef").await;
        let first = publish(&server, &chef, &recipe_body(&data, "Pancakes")).await;
        let second = publish(&server, &chef, &recipe_body(&data, "Waffles")).await;

        for recipe in [&first, &second] {
            let response = server
                .post(&format!("/api/recipes/{}/shopping_cart/", recipe["id"]))
                .add_header(header::AUTHORIZATION, auth_header(&chef))
                .await;
            response.assert_status(StatusCode::CREATED);
            let short: Value = response.json();
            assert_eq!(short["cooking_time"], 20);
        }
        server
            .post(&format!("/api/recipes/{}/shopping_cart/", first["id"]))
            .add_header(header::AUTHORIZATION, auth_header(&chef))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let text = server
            .get("/api/recipes/download_shopping_cart/")
            .add_header(header::AUTHORIZATION, auth_header(&chef))
            .await;
        text.assert_status_ok();
        let disposition = text.header(header::CONTENT_DISPOSITION);
        assert!(disposition.to_str().unwrap().starts_with("attachment; filename=\"shopping_list("));
        let body = text.text();
        assert!(body.contains("1. Egg - 4 pcs"));
        assert!(body.contains("2. Flour - 200 g"));

        let csv = server
            .get("/api/recipes/download_shopping_cart/?format=csv")
            .add_header(header::AUTHORIZATION, auth_header(&chef))
            .await;
        assert!(csv.text().starts_with("name,measurement_unit,amount\r\negg,pcs,4\r\n"));

        server
            .get("/api/recipes/download_shopping_cart/?format=pdf")
            .add_header(header::AUTHORIZATION, auth_header(&chef))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .delete(&format!("/api/recipes/{}/shopping_cart/", first["id"]))
            .add_header(header::AUTHORIZATION, auth_header(&chef))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .delete("/api/recipes/999/favorite/")
            .add_header(header::AUTHORIZATION, auth_header(&chef))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_short_link_round_trip() {
        let (server, state) = test_server().await;
        let data = seed_reference_data(&state).await;
        let chef = signup(&server, "chef").await;
        let recipe = publish(&server, &chef, &recipe_body(&data, "Toast")).await;
        let id = recipe["id"].as_i64().unwrap();

        let body: Value = server.get(&format!("/api/recipes/{}/get-link/", id)).await.json();
        let url = body["short-link"].as_str().unwrap().to_string();
        let again: Value = server.get(&format!("/api/recipes/{}/get-link/", id)).await.json();
        assert_eq!(again["short-link"], url.as_str());

        let path = &url[url.find("/s/").unwrap()..];
        let redirect = server.get(path).await;
        redirect.assert_status(StatusCode::FOUND);
        assert_eq!(
            redirect.header(header::LOCATION).to_str().unwrap(),
            format!("/recipes/{}/", id)
        );

        server.get("/api/recipes/999/get-link/").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_short_links_stop_resolving_after_delete() {
        let (server, state) = test_server().await;
        let data = seed_reference_data(&state).await;
        let chef = signup(&server, "chef").await;
        let recipe = publish(&server, &chef, &recipe_body(&data, "Toast")).await;
        let id = recipe["id"].as_i64().unwrap();

        let body: Value = server.get(&format!("/api/recipes/{}/get-link/", id)).await.json();
        let url = body["short-link"].as_str().unwrap().to_string();
        let slug_path = url[url.find("/s/").unwrap()..].to_string();
        let id_path = format!("/s/{}/", id);

        server.get(&slug_path).await.assert_status(StatusCode::FOUND);
        server.get(&id_path).await.assert_status(StatusCode::FOUND);

        server
            .delete(&format!("/api/recipes/{}/", id))
            .add_header(header::AUTHORIZATION, auth_header(&chef))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server.get(&slug_path).await.assert_status(StatusCode::NOT_FOUND);
        server.get(&id_path).await.assert_status(StatusCode::NOT_FOUND);
    }
}
