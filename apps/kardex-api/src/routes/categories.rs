//! Product categories. Listing active ones is open to every role; the rest
//! is administrator-only.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use kardex_core::validation::{validate_category_update, validate_new_category, RawCategory};
use kardex_core::{Category, Role};
use tracing::info;

use super::IdResponse;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{AppJson, AppPath};
use crate::AppState;

const ADMIN: &[Role] = &[Role::Administrator];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categorias", get(list_active).post(create))
        .route("/categoriasTodas", get(list_all))
        .route(
            "/categorias/{id}",
            get(get_one).put(update).delete(disable),
        )
}

async fn list_active(_auth: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.db.categories().list_active().await?))
}

async fn list_all(auth: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    auth.require(ADMIN)?;
    Ok(Json(state.db.categories().list_all().await?))
}

async fn get_one(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<Json<Category>> {
    auth.require(ADMIN)?;
    state
        .db
        .categories()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Category", id))
}

async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(raw): AppJson<RawCategory>,
) -> ApiResult<(StatusCode, Json<IdResponse>)> {
    auth.require(ADMIN)?;
    let category = validate_new_category(&raw)?;

    let id = state.db.categories().insert(&category).await?;
    info!(category_id = id, name = %category.name, "Category created");

    Ok((StatusCode::CREATED, Json(IdResponse::new(id))))
}

async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(raw): AppJson<RawCategory>,
) -> ApiResult<Json<IdResponse>> {
    auth.require(ADMIN)?;
    let update = validate_category_update(&raw)?;

    state.db.categories().update(id, &update).await?;
    info!(category_id = id, "Category updated");

    Ok(Json(IdResponse::new(id)))
}

/// Soft delete: the category stays, marked inactive.
async fn disable(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<Json<IdResponse>> {
    auth.require(ADMIN)?;

    state.db.categories().disable(id).await?;
    info!(category_id = id, "Category disabled");

    Ok(Json(IdResponse::new(id)))
}
