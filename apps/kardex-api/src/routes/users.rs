//! User administration. Administrator-only.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use kardex_core::validation::{
    validate_new_user, validate_password_reset, validate_user_update, RawPasswordReset, RawUser,
};
use kardex_core::{Role, RoleRecord, User};
use tracing::info;

use super::IdResponse;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{AppJson, AppPath};
use crate::AppState;

const ADMIN: &[Role] = &[Role::Administrator];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/roles", get(list_roles))
        .route("/usuarios", get(list))
        .route("/usuarios/{id}", get(get_one).put(update))
        .route("/nuevoUsuario", post(create))
        .route("/restablecerPassword", post(reset_password))
}

async fn list_roles(auth: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<RoleRecord>>> {
    auth.require(ADMIN)?;
    Ok(Json(state.db.roles().list().await?))
}

async fn list(auth: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    auth.require(ADMIN)?;
    Ok(Json(state.db.users().list().await?))
}

async fn get_one(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<Json<User>> {
    auth.require(ADMIN)?;
    state
        .db
        .users()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User", id))
}

/// New users start active.
async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(raw): AppJson<RawUser>,
) -> ApiResult<(StatusCode, Json<IdResponse>)> {
    auth.require(ADMIN)?;
    let user = validate_new_user(&raw)?;

    let id = state.db.users().insert(&user).await?;
    info!(user_id = id, login = %user.login, role = user.role.name(), "User created");

    Ok((StatusCode::CREATED, Json(IdResponse::new(id))))
}

async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(raw): AppJson<RawUser>,
) -> ApiResult<Json<IdResponse>> {
    auth.require(ADMIN)?;
    let update = validate_user_update(&raw)?;

    state.db.users().update(id, &update).await?;
    info!(user_id = id, status = update.status.as_str(), "User updated");

    Ok(Json(IdResponse::new(id)))
}

async fn reset_password(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(raw): AppJson<RawPasswordReset>,
) -> ApiResult<StatusCode> {
    auth.require(ADMIN)?;
    let reset = validate_password_reset(&raw)?;

    state.db.users().reset_password(&reset).await?;
    info!(login = %reset.login, by = %auth.login, "Password reset");

    Ok(StatusCode::NO_CONTENT)
}
