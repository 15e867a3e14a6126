//! # Kardex API
//!
//! HTTP + WebSocket surface of the Kardex inventory service.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     POST /api/movimientos                               │
//! │                                                                         │
//! │  TraceLayer / CorsLayer                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AuthUser (bearer JWT) ──► role check ──► AppJson<RawMovement>          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  kardex_core::validation ──► kardex_db::StockLedger (one transaction)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  201 {id}   and   PostCommitHooks ──► DashboardHub ──► /ws observers    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Environment configuration
//! - [`error`] - `ApiError` and its HTTP mapping
//! - [`auth`] - JWT issuing and the `AuthUser` extractor
//! - [`extract`] - Extractors with JSON error bodies
//! - [`hooks`] - Post-commit hooks
//! - [`hub`] - Dashboard WebSocket fan-out
//! - [`routes`] - Resource routers

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use kardex_db::Database;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod hooks;
pub mod hub;
pub mod routes;

use auth::JwtManager;
use config::ApiConfig;
use hooks::{DashboardHook, LedgerEvent, PostCommitHooks};
use hub::DashboardHub;

// =============================================================================
// Application State
// =============================================================================

/// Shared state handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub hub: DashboardHub,
    pub hooks: PostCommitHooks,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    /// Wires the state with the dashboard hook installed.
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let hub = DashboardHub::new();
        let hooks = PostCommitHooks::new().with(DashboardHook::new(
            db.clone(),
            hub.clone(),
            config.expiry_horizon_days,
        ));

        AppState {
            jwt: Arc::new(JwtManager::new(
                config.jwt_secret.clone(),
                config.jwt_expiry_secs,
            )),
            db,
            hub,
            hooks,
            config: Arc::new(config),
        }
    }

    /// Runs the post-commit hooks for a committed change.
    pub fn notify(&self, event: LedgerEvent) {
        self.hooks.notify(event);
    }
}

// =============================================================================
// Router
// =============================================================================

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ws", get(hub::ws_handler))
        .nest("/api", routes::api_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    match origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            warn!(origin, "Invalid CORS_ORIGIN, allowing any origin");
            layer.allow_origin(Any)
        }
    }
}

async fn root() -> &'static str {
    "Kardex API"
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    if state.db.health_check().await {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable" })),
        )
    }
}
