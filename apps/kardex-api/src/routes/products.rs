//! Product catalog and per-product stock reports.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use kardex_core::validation::{
    validate_date_range, validate_new_product, validate_product_update, RawProduct,
};
use kardex_core::{DailyProductMovement, KardexReport, Product, Role};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::IdResponse;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::AppState;

const CATALOG_EDITORS: &[Role] = &[Role::Administrator, Role::Supervisor];

/// `?startDate=&endDate=` bounds of a report.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningBalanceResponse {
    pub opening_balance: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/productos", get(list).post(create))
        .route("/productos/{id}", get(get_one).put(update))
        .route("/productos/{id}/kardex", get(kardex))
        .route("/productos/{id}/saldoInicial", get(opening_balance))
        .route("/productos/{id}/movimientos", get(daily_movements))
}

async fn list(_auth: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().list().await?))
}

async fn get_one(
    _auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<Json<Product>> {
    state
        .db
        .products()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product", id))
}

async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(raw): AppJson<RawProduct>,
) -> ApiResult<(StatusCode, Json<IdResponse>)> {
    auth.require(CATALOG_EDITORS)?;
    let product = validate_new_product(&raw)?;

    let id = state.db.products().insert(&product).await?;
    info!(product_id = id, name = %product.name, by = %auth.login, "Product created");

    Ok((StatusCode::CREATED, Json(IdResponse::new(id))))
}

async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(raw): AppJson<RawProduct>,
) -> ApiResult<Json<IdResponse>> {
    auth.require(CATALOG_EDITORS)?;
    let product = validate_product_update(&raw)?;

    state.db.products().update(id, &product).await?;
    info!(product_id = id, by = %auth.login, "Product updated");

    Ok(Json(IdResponse::new(id)))
}

/// Ledger lines of the product inside the range, with running balance.
async fn kardex(
    _auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppQuery(params): AppQuery<RangeParams>,
) -> ApiResult<Json<KardexReport>> {
    let range = validate_date_range(params.start_date.as_deref(), params.end_date.as_deref())?;
    Ok(Json(state.db.movements().kardex(id, &range).await?))
}

async fn opening_balance(
    _auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppQuery(params): AppQuery<RangeParams>,
) -> ApiResult<Json<OpeningBalanceResponse>> {
    let range = validate_date_range(params.start_date.as_deref(), None)?;
    let opening_balance = state.db.movements().opening_balance(id, range.start).await?;
    Ok(Json(OpeningBalanceResponse { opening_balance }))
}

async fn daily_movements(
    _auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppQuery(params): AppQuery<RangeParams>,
) -> ApiResult<Json<Vec<DailyProductMovement>>> {
    let range = validate_date_range(params.start_date.as_deref(), params.end_date.as_deref())?;
    Ok(Json(state.db.movements().daily_for_product(id, &range).await?))
}
