//! # HTTP Routes
//!
//! One module per resource, each exposing `router()`; merged under `/api`
//! by [`crate::build_router`].
//!
//! ```text
//! /api
//!  ├── login, restablecerPassword        auth.rs / users.rs
//!  ├── productos[/{id}[/kardex|...]]     products.rs
//!  ├── categorias, categoriasTodas       categories.rs
//!  ├── roles, usuarios, nuevoUsuario     users.rs
//!  ├── lotes[/{id}/serial-numbers]       batches.rs   (ledger write)
//!  ├── movimientos, movimientosInventario movements.rs (ledger write)
//!  ├── charts/*                          charts.rs
//!  └── stock-stop/*                      stock_stop.rs
//! ```

use axum::Router;
use serde::{Deserialize, Serialize};

use crate::AppState;

pub mod auth;
pub mod batches;
pub mod categories;
pub mod charts;
pub mod movements;
pub mod products;
pub mod stock_stop;
pub mod users;

/// Body of create and update responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdResponse {
    pub id: i64,
}

impl IdResponse {
    pub fn new(id: i64) -> Self {
        IdResponse { id }
    }
}

/// Every `/api` route.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(products::router())
        .merge(categories::router())
        .merge(users::router())
        .merge(batches::router())
        .merge(movements::router())
        .merge(charts::router())
        .merge(stock_stop::router())
}
