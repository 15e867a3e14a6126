//! `/api/charts/*`: the dashboard views on demand, same data the hub pushes.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use kardex_core::{Batch, DailyTotal, ExpiringBatch, LowStockProduct, MovementKind};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/charts/movimientosxdia", get(movements_per_day))
        .route("/charts/entradasxdia", get(inbound_per_day))
        .route("/charts/salidasxdia", get(outbound_per_day))
        .route("/charts/lotesactuales", get(current_batches))
        .route("/charts/caducidadlotes", get(batches_with_expiry))
        .route("/charts/productosPorVencer", get(expiring_soon))
        .route("/charts/productosBajoStockMinimo", get(low_stock))
}

async fn movements_per_day(_auth: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<DailyTotal>>> {
    Ok(Json(state.db.dashboard().daily_totals(None).await?))
}

async fn inbound_per_day(_auth: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<DailyTotal>>> {
    Ok(Json(
        state.db.dashboard().daily_totals(Some(MovementKind::Entrada)).await?,
    ))
}

async fn outbound_per_day(_auth: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<DailyTotal>>> {
    Ok(Json(
        state.db.dashboard().daily_totals(Some(MovementKind::Salida)).await?,
    ))
}

async fn current_batches(_auth: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<Batch>>> {
    Ok(Json(state.db.dashboard().current_batches().await?))
}

async fn batches_with_expiry(_auth: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<Batch>>> {
    Ok(Json(state.db.dashboard().batches_with_expiry().await?))
}

async fn expiring_soon(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ExpiringBatch>>> {
    let today = Utc::now().date_naive();
    let horizon = state.config.expiry_horizon_days;
    Ok(Json(state.db.dashboard().expiring_soon(today, horizon).await?))
}

async fn low_stock(_auth: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<LowStockProduct>>> {
    Ok(Json(state.db.dashboard().low_stock().await?))
}
