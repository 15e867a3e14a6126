//! # Domain Types
//!
//! Core domain types used throughout Kardex.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Category     │◄──│    Product      │◄──│     Batch       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  id             │       │
//! │  │  name (unique   │   │  stock_min/max  │   │  initial_qty    │       │
//! │  │   when active)  │   │  tracks_serials │   │  current_qty    │       │
//! │  │  status         │   └─────────────────┘   │  expiry_date    │       │
//! │  └─────────────────┘                         └───────┬─────────┘       │
//! │                                                      │                  │
//! │                              ┌───────────────────────┴────┐            │
//! │                              ▼                            ▼            │
//! │                     ┌─────────────────┐         ┌─────────────────┐    │
//! │                     │   SerialUnit    │◄────────│    Movement     │    │
//! │                     │  ─────────────  │ flips   │  ─────────────  │    │
//! │                     │  code (unique)  │ status  │  kind           │    │
//! │                     │  status         │         │  quantity       │    │
//! │                     └─────────────────┘         │  serial_code?   │    │
//! │                                                 └─────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Read models returned to HTTP clients serialize with camelCase field names.
//! Normalized command payloads (the output of [`crate::validation`]) live at
//! the bottom of this file.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Role
// =============================================================================

/// User role. Stored as its numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Administrator,
    Supervisor,
    Operator,
}

impl Role {
    /// Every role, in id order.
    pub const ALL: [Role; 3] = [Role::Administrator, Role::Supervisor, Role::Operator];

    /// Resolves a role from its persisted id.
    pub fn from_id(id: i64) -> Option<Role> {
        match id {
            1 => Some(Role::Administrator),
            2 => Some(Role::Supervisor),
            3 => Some(Role::Operator),
            _ => None,
        }
    }

    /// Returns the persisted id.
    #[inline]
    pub const fn id(self) -> i64 {
        match self {
            Role::Administrator => 1,
            Role::Supervisor => 2,
            Role::Operator => 3,
        }
    }

    /// Display name, as seeded in the roles table.
    pub const fn name(self) -> &'static str {
        match self {
            Role::Administrator => "Administrador",
            Role::Supervisor => "Supervisor",
            Role::Operator => "Operador",
        }
    }
}

// =============================================================================
// Status Enums
// =============================================================================

/// Lifecycle status for categories and users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum RecordStatus {
    #[serde(rename = "Activo")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Activo"))]
    Active,
    #[serde(rename = "Inactivo")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Inactivo"))]
    Inactive,
}

impl RecordStatus {
    /// Parses the wire value (`Activo` / `Inactivo`).
    pub fn parse(value: &str) -> Option<RecordStatus> {
        match value {
            "Activo" => Some(RecordStatus::Active),
            "Inactivo" => Some(RecordStatus::Inactive),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Active => "Activo",
            RecordStatus::Inactive => "Inactivo",
        }
    }
}

/// Status of a serialized unit.
///
/// ## State Machine
/// ```text
///            Salida accepted
///   Active ──────────────────► Inactive
///  (in stock) ◄────────────────── (dispensed)
///            Entrada accepted
/// ```
/// Every unit starts Active when its batch is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum SerialStatus {
    #[serde(rename = "Activo")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Activo"))]
    Active,
    #[serde(rename = "Inactivo")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Inactivo"))]
    Inactive,
}

impl SerialStatus {
    /// Parses the wire value (`Activo` / `Inactivo`).
    pub fn parse(value: &str) -> Option<SerialStatus> {
        match value {
            "Activo" => Some(SerialStatus::Active),
            "Inactivo" => Some(SerialStatus::Inactive),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            SerialStatus::Active => "Activo",
            SerialStatus::Inactive => "Inactivo",
        }
    }
}

/// Direction of a stock movement.
///
/// - `Entrada`: units come back into the batch
/// - `Salida`: units leave the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum MovementKind {
    Entrada,
    Salida,
}

impl MovementKind {
    /// Parses the wire value.
    pub fn parse(value: &str) -> Option<MovementKind> {
        match value {
            "Entrada" => Some(MovementKind::Entrada),
            "Salida" => Some(MovementKind::Salida),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            MovementKind::Entrada => "Entrada",
            MovementKind::Salida => "Salida",
        }
    }

    /// Sign applied to a quantity of this kind in a running balance.
    #[inline]
    pub const fn sign(self) -> i64 {
        match self {
            MovementKind::Entrada => 1,
            MovementKind::Salida => -1,
        }
    }

    /// Serial status a unit must have before a movement of this kind.
    pub const fn required_serial_status(self) -> SerialStatus {
        match self {
            MovementKind::Salida => SerialStatus::Active,
            MovementKind::Entrada => SerialStatus::Inactive,
        }
    }

    /// Serial status a unit ends up in after a movement of this kind.
    pub const fn resulting_serial_status(self) -> SerialStatus {
        match self {
            MovementKind::Salida => SerialStatus::Inactive,
            MovementKind::Entrada => SerialStatus::Active,
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Stock Stop
// =============================================================================

/// Process-wide switch that freezes batch registrations and movements.
///
/// Read from the settings table inside the operation's transaction and
/// handed to [`crate::ledger`] as a plain value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockStop {
    Active,
    #[default]
    Inactive,
}

impl StockStop {
    /// Interprets the persisted setting. Absent or anything but `"true"` is
    /// inactive.
    pub fn from_setting(value: Option<&str>) -> StockStop {
        match value {
            Some("true") => StockStop::Active,
            _ => StockStop::Inactive,
        }
    }

    /// Value written to the settings table.
    pub const fn as_setting(self) -> &'static str {
        match self {
            StockStop::Active => "true",
            StockStop::Inactive => "false",
        }
    }

    #[inline]
    pub const fn is_active(self) -> bool {
        matches!(self, StockStop::Active)
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: RecordStatus,
}

/// A product. Stock lives on its batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category_id: i64,
    /// Joined from the category for listings.
    pub category_name: Option<String>,
    pub stock_min: i64,
    pub stock_max: i64,
    /// Whether every unit carries its own serial code.
    pub tracks_serials: bool,
}

// =============================================================================
// Accounts
// =============================================================================

/// Role row as stored in the roles table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RoleRecord {
    pub id: i64,
    pub name: String,
}

/// A user account, without its password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub name: String,
    pub surname: String,
    pub role_id: i64,
    pub role_name: Option<String>,
    pub status: RecordStatus,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        Role::from_id(self.role_id)
    }

    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }
}

// =============================================================================
// Stock
// =============================================================================

/// A batch ("lote") of one product.
///
/// ## Invariant
/// `0 <= current_quantity <= initial_quantity` and
/// `current_quantity = initial_quantity + Σ entradas - Σ salidas`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Batch {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub tracks_serials: bool,
    #[ts(as = "String")]
    pub entry_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    pub initial_quantity: i64,
    pub current_quantity: i64,
    pub notes: Option<String>,
    pub created_by: i64,
}

/// A serialized unit belonging to a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SerialUnit {
    pub code: String,
    pub batch_id: i64,
    pub product_id: i64,
    pub status: SerialStatus,
}

/// An accepted stock movement. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Movement {
    pub id: i64,
    pub batch_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub kind: MovementKind,
    pub quantity: i64,
    pub notes: Option<String>,
    pub user_id: i64,
    pub user_login: Option<String>,
    pub serial_code: Option<String>,
    #[ts(as = "String")]
    pub moved_at: DateTime<Utc>,
}

// =============================================================================
// Dashboard Read Models
// =============================================================================

/// Sum of moved quantities on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DailyTotal {
    /// `YYYY-MM-DD`
    pub day: String,
    pub total: i64,
}

/// Inbound and outbound totals of one product on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DailyProductMovement {
    pub day: String,
    pub inbound: i64,
    pub outbound: i64,
}

/// A batch with stock left that expires inside the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExpiringBatch {
    pub batch_id: i64,
    pub product_id: i64,
    /// `"<product name> (Lote <batch id>)"`
    pub label: String,
    #[ts(as = "String")]
    pub entry_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    pub days_to_expiry: i64,
    pub current_quantity: i64,
}

/// A product whose stock across batches is below its minimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LowStockProduct {
    pub product_id: i64,
    pub name: String,
    pub current_stock: i64,
    pub stock_min: i64,
    /// `stock_min - current_stock`, always positive.
    pub shortfall: i64,
}

// =============================================================================
// Kardex
// =============================================================================

/// Where a kardex line comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum LedgerSource {
    /// The batch's initial quantity entering stock.
    BatchRegistration,
    /// A recorded movement.
    Movement,
}

/// One raw stock event of a product, before balances are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerLine {
    pub source: LedgerSource,
    /// Movement id, or batch id for registrations.
    pub reference_id: i64,
    pub batch_id: i64,
    pub at: DateTime<Utc>,
    pub kind: MovementKind,
    pub quantity: i64,
    pub serial_code: Option<String>,
    pub notes: Option<String>,
}

/// One kardex row with the running balance after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct KardexEntry {
    pub source: LedgerSource,
    pub reference_id: i64,
    pub batch_id: i64,
    #[ts(as = "String")]
    pub at: DateTime<Utc>,
    pub kind: MovementKind,
    pub quantity: i64,
    pub serial_code: Option<String>,
    pub notes: Option<String>,
    pub balance: i64,
}

/// Running-balance report of one product over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct KardexReport {
    pub product_id: i64,
    pub opening_balance: i64,
    pub closing_balance: i64,
    pub entries: Vec<KardexEntry>,
}

// =============================================================================
// Normalized Commands
// =============================================================================
// Produced by `validation`, consumed by repositories and the ledger.

/// Fields of a product create or update.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub category_id: i64,
    pub stock_min: i64,
    pub stock_max: i64,
    pub tracks_serials: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

/// Category update. `status: None` keeps the current status.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryUpdate {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub login: String,
    pub name: String,
    pub surname: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserUpdate {
    pub login: String,
    pub name: String,
    pub surname: String,
    pub role: Role,
    pub status: RecordStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PasswordReset {
    pub login: String,
    pub new_password: String,
}

/// A batch registration request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBatch {
    pub product_id: i64,
    pub quantity: i64,
    /// Defaults to the registration time.
    pub entry_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Empty for products without serial tracking.
    pub serial_codes: Vec<String>,
}

/// A movement registration request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    pub batch_id: i64,
    pub kind: MovementKind,
    pub quantity: i64,
    pub notes: Option<String>,
    pub serial_code: Option<String>,
}

/// Optional inclusive bounds for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Whether `at` falls before the range start.
    pub fn is_before(&self, at: DateTime<Utc>) -> bool {
        self.start.is_some_and(|start| at < start)
    }

    /// Whether `at` falls after the range end.
    pub fn is_after(&self, at: DateTime<Utc>) -> bool {
        self.end.is_some_and(|end| at > end)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
