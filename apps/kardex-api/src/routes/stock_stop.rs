//! The stock-stop switch. While active, batch registrations and movements
//! are refused with 403.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use kardex_core::{Role, StockStop};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::hooks::LedgerEvent;
use crate::AppState;

const SWITCH_HOLDERS: &[Role] = &[Role::Administrator, Role::Supervisor];

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockStopStatus {
    pub stock_stop_active: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stock-stop/status", get(status))
        .route("/stock-stop/activate", post(activate))
        .route("/stock-stop/deactivate", post(deactivate))
}

async fn status(_auth: AuthUser, State(state): State<AppState>) -> ApiResult<Json<StockStopStatus>> {
    let stop = state.db.settings().stock_stop().await?;
    Ok(Json(StockStopStatus {
        stock_stop_active: stop.is_active(),
    }))
}

async fn activate(auth: AuthUser, State(state): State<AppState>) -> ApiResult<Json<StockStopStatus>> {
    switch(auth, state, StockStop::Active).await
}

async fn deactivate(auth: AuthUser, State(state): State<AppState>) -> ApiResult<Json<StockStopStatus>> {
    switch(auth, state, StockStop::Inactive).await
}

async fn switch(auth: AuthUser, state: AppState, stop: StockStop) -> ApiResult<Json<StockStopStatus>> {
    auth.require(SWITCH_HOLDERS)?;

    state.db.settings().set_stock_stop(stop).await?;
    info!(active = stop.is_active(), by = %auth.login, "Stock stop changed");

    state.notify(LedgerEvent::StockStopChanged(stop));
    Ok(Json(StockStopStatus {
        stock_stop_active: stop.is_active(),
    }))
}
