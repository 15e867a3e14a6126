//! Movement listing and registration.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use kardex_core::validation::{validate_new_movement, RawMovement};
use kardex_core::Movement;
use tracing::info;

use super::IdResponse;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::AppJson;
use crate::hooks::LedgerEvent;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/movimientosInventario", get(list))
        .route("/movimientos", post(register))
}

async fn list(_auth: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<Movement>>> {
    Ok(Json(state.db.movements().list().await?))
}

async fn register(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(raw): AppJson<RawMovement>,
) -> ApiResult<(StatusCode, Json<IdResponse>)> {
    let movement = validate_new_movement(&raw)?;

    let movement_id = state
        .db
        .ledger()
        .register_movement(&movement, auth.user_id)
        .await?;
    info!(
        movement_id,
        batch_id = movement.batch_id,
        kind = %movement.kind,
        quantity = movement.quantity,
        by = %auth.login,
        "Movement registered"
    );

    state.notify(LedgerEvent::MovementRegistered {
        movement_id,
        batch_id: movement.batch_id,
    });
    Ok((StatusCode::CREATED, Json(IdResponse::new(movement_id))))
}
