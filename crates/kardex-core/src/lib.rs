//! # kardex-core: Pure Business Logic for Kardex
//!
//! This crate holds the rules that keep batches, serial units and movements
//! mutually consistent. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kardex Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 kardex-api (axum handlers)                      │   │
//! │  │    access control ──► validation ──► ledger ──► push            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kardex-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌────────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ validation │  │  ledger   │  │  kardex   │  │   │
//! │  │   │  Product  │  │  payload   │  │  batch &  │  │  running  │  │   │
//! │  │   │  Batch    │  │  rules     │  │  movement │  │  balance  │  │   │
//! │  │   └───────────┘  └────────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 kardex-db (Database Layer)                      │   │
//! │  │      SQLite queries, migrations, transactional stock ledger     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Batch, Movement, read models)
//! - [`error`] - Validation and ledger error types
//! - [`validation`] - Raw payload → typed payload, first violated rule wins
//! - [`ledger`] - Batch registration and movement rules, serial state machine
//! - [`kardex`] - Per-product running balance report
//!
//! ## Example Usage
//!
//! ```rust
//! use kardex_core::ledger::{plan_movement, BatchState};
//! use kardex_core::{MovementKind, NewMovement, StockStop};
//!
//! let batch = BatchState {
//!     batch_id: 1,
//!     product_id: 7,
//!     tracks_serials: false,
//!     initial_quantity: 10,
//!     current_quantity: 10,
//! };
//! let movement = NewMovement {
//!     batch_id: 1,
//!     kind: MovementKind::Salida,
//!     quantity: 7,
//!     notes: None,
//!     serial_code: None,
//! };
//!
//! let plan = plan_movement(StockStop::Inactive, &batch, &movement, None).unwrap();
//! assert_eq!(plan.resulting_quantity, 3);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod kardex;
pub mod ledger;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, LedgerError, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Key of the stock-stop row in the settings table.
pub const STOCK_STOP_KEY: &str = "StockStop";

/// Default horizon for the "expiring soon" dashboard view, in days.
pub const EXPIRY_HORIZON_DAYS: i64 = 30;

/// Maximum length of a serial code (width of `serial_units.code`).
pub const MAX_SERIAL_CODE_LEN: usize = 30;
