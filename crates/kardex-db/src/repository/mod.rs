//! # Repository Module
//!
//! Database repository implementations for Kardex.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  axum handler                                                          │
//! │       │                                                                 │
//! │       │  db.products().get_by_id(7)                                    │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── list(&self)                                                       │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── insert(&self, product)                                            │
//! │  └── update(&self, id, product)                                        │
//! │       │                                                                 │
//! │       │  parameterized SQL                                             │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock-changing writes don't live here: they go through
//! [`crate::StockLedger`] so that rule checks and writes share a transaction.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD
//! - [`CategoryRepository`](category::CategoryRepository) - Categories, soft delete
//! - [`UserRepository`](user::UserRepository) / [`RoleRepository`](user::RoleRepository)
//! - [`BatchRepository`](batch::BatchRepository) - Batch listings, serial units
//! - [`MovementRepository`](movement::MovementRepository) - Movement listings, kardex
//! - [`SettingsRepository`](settings::SettingsRepository) - Stock-stop flag
//! - [`DashboardRepository`](dashboard::DashboardRepository) - Aggregate views

use chrono::{DateTime, SecondsFormat, Utc};

pub mod batch;
pub mod category;
pub mod dashboard;
pub mod movement;
pub mod product;
pub mod settings;
pub mod user;

/// Formats a timestamp the way every timestamp column stores it.
///
/// Fixed width (microseconds, `Z` suffix) so that text comparison in SQL
/// orders the same as time.
pub(crate) fn sql_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sql_timestamp_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        assert_eq!(sql_timestamp(whole), "2024-05-01T08:00:00.000000Z");
    }
}
