//! Batch listing and registration.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use kardex_core::validation::{validate_new_batch, RawBatch};
use kardex_core::{Batch, SerialStatus, SerialUnit, ValidationError};
use serde::Deserialize;
use tracing::info;

use super::IdResponse;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::hooks::LedgerEvent;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SerialParams {
    pub estado: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/lotes", get(list).post(register))
        .route("/lotes/{id}/serial-numbers", get(serial_numbers))
}

async fn list(_auth: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<Batch>>> {
    Ok(Json(state.db.batches().list().await?))
}

/// Registers a batch, plus its serial units when the product tracks them.
/// The creator is the caller.
async fn register(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(raw): AppJson<RawBatch>,
) -> ApiResult<(StatusCode, Json<IdResponse>)> {
    let batch = validate_new_batch(&raw)?;

    let batch_id = state.db.ledger().register_batch(&batch, auth.user_id).await?;
    info!(
        batch_id,
        product_id = batch.product_id,
        quantity = batch.quantity,
        by = %auth.login,
        "Batch registered"
    );

    state.notify(LedgerEvent::BatchRegistered { batch_id });
    Ok((StatusCode::CREATED, Json(IdResponse::new(batch_id))))
}

async fn serial_numbers(
    _auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppQuery(params): AppQuery<SerialParams>,
) -> ApiResult<Json<Vec<SerialUnit>>> {
    let status = match params.estado.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => None,
        Some(raw) => Some(SerialStatus::parse(raw).ok_or_else(|| ValidationError::NotAllowed {
            field: "estado".to_string(),
            allowed: vec!["Activo".to_string(), "Inactivo".to_string()],
        })?),
    };

    Ok(Json(state.db.batches().serial_numbers(id, status).await?))
}
