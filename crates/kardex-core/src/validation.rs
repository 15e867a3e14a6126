//! # Validation Module
//!
//! Turns loosely typed request payloads into normalized commands.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (kardex-api)                                  │
//! │  └── JSON syntax only; every field arrives as serde_json::Value        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── presence / non-empty after trim                                   │
//! │  ├── integers from numbers OR numeric strings                          │
//! │  ├── domain bounds (quantity > 0, stockMin <= stockMax)                │
//! │  └── enum membership (role, status, movement kind)                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Ledger rules (needs persisted state, see `ledger`)           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (UNIQUE / FK / CHECK constraints)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every validator stops at the first violated rule, checking fields in the
//! order they are declared on the raw payload.
//!
//! ## Usage
//! ```rust
//! use kardex_core::validation::{validate_new_movement, RawMovement};
//! use serde_json::json;
//!
//! let raw: RawMovement = serde_json::from_value(json!({
//!     "batchId": "4",
//!     "kind": "Salida",
//!     "quantity": 2
//! }))
//! .unwrap();
//!
//! let movement = validate_new_movement(&raw).unwrap();
//! assert_eq!(movement.batch_id, 4);
//! ```

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ValidationError;
use crate::types::{
    CategoryUpdate, Credentials, DateRange, MovementKind, NewBatch, NewCategory, NewMovement,
    NewProduct, NewUser, PasswordReset, RecordStatus, Role, UserUpdate,
};
use crate::MAX_SERIAL_CODE_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 100;
const MAX_TEXT_LEN: usize = 255;
const MAX_ACCOUNT_FIELD_LEN: usize = 50;
const MAX_PASSWORD_LEN: usize = 128;

// =============================================================================
// Raw Payloads
// =============================================================================
// Every field is an optional JSON value so that a wrong type becomes a
// field-level validation error instead of a body-level parse failure.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProduct {
    pub name: Option<Value>,
    pub description: Option<Value>,
    pub category_id: Option<Value>,
    pub stock_min: Option<Value>,
    pub stock_max: Option<Value>,
    pub tracks_serials: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCategory {
    pub name: Option<Value>,
    pub description: Option<Value>,
    pub status: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUser {
    pub login: Option<Value>,
    pub name: Option<Value>,
    pub surname: Option<Value>,
    pub password: Option<Value>,
    pub role_id: Option<Value>,
    pub status: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLogin {
    pub login: Option<Value>,
    pub password: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPasswordReset {
    pub login: Option<Value>,
    pub new_password: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBatch {
    pub product_id: Option<Value>,
    pub quantity: Option<Value>,
    pub entry_date: Option<Value>,
    pub expiry_date: Option<Value>,
    pub notes: Option<Value>,
    pub serial_numbers: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMovement {
    pub batch_id: Option<Value>,
    pub kind: Option<Value>,
    pub quantity: Option<Value>,
    pub notes: Option<Value>,
    pub serial_code: Option<Value>,
}

// =============================================================================
// Field Helpers
// =============================================================================

/// Optional text: absent, null or blank → `None`.
fn optional_text(field: &str, value: Option<&Value>, max: usize) -> ValidationResult<Option<String>> {
    let text = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s.trim(),
        Some(_) => return Err(ValidationError::invalid_format(field, "must be text")),
    };

    if text.is_empty() {
        return Ok(None);
    }

    if text.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(Some(text.to_string()))
}

fn required_text(field: &str, value: Option<&Value>, max: usize) -> ValidationResult<String> {
    optional_text(field, value, max)?.ok_or_else(|| ValidationError::required(field))
}

/// Parses an integer from a JSON number or a numeric string.
///
/// ## Example
/// ```text
/// 12      → 12
/// "12"    → 12
/// " 12 "  → 12
/// 12.5    → InvalidFormat
/// "doce"  → InvalidFormat
/// ```
fn optional_int(field: &str, value: Option<&Value>) -> ValidationResult<Option<i64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| ValidationError::invalid_format(field, "must be an integer")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ValidationError::invalid_format(field, "must be an integer")),
        Some(_) => Err(ValidationError::invalid_format(field, "must be an integer")),
    }
}

fn required_int(field: &str, value: Option<&Value>) -> ValidationResult<i64> {
    optional_int(field, value)?.ok_or_else(|| ValidationError::required(field))
}

fn positive_int(field: &str, value: Option<&Value>) -> ValidationResult<i64> {
    let n = required_int(field, value)?;
    if n <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(n)
}

/// Flags accept booleans, 0/1 and their string forms. Absent is `false`.
fn flag(field: &str, value: Option<&Value>) -> ValidationResult<bool> {
    match value {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(ValidationError::invalid_format(field, "must be a boolean")),
        },
        Some(Value::String(s)) => match s.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            _ => Err(ValidationError::invalid_format(field, "must be a boolean")),
        },
        Some(_) => Err(ValidationError::invalid_format(field, "must be a boolean")),
    }
}

fn status(field: &str, value: Option<&Value>) -> ValidationResult<Option<RecordStatus>> {
    match optional_text(field, value, MAX_NAME_LEN)? {
        None => Ok(None),
        Some(s) => RecordStatus::parse(&s).map(Some).ok_or_else(|| {
            ValidationError::NotAllowed {
                field: field.to_string(),
                allowed: vec!["Activo".to_string(), "Inactivo".to_string()],
            }
        }),
    }
}

fn role(field: &str, value: Option<&Value>) -> ValidationResult<Role> {
    let id = required_int(field, value)?;
    Role::from_id(id).ok_or_else(|| ValidationError::NotAllowed {
        field: field.to_string(),
        allowed: Role::ALL.iter().map(|r| r.id().to_string()).collect(),
    })
}

fn optional_date(field: &str, value: Option<&Value>) -> ValidationResult<Option<NaiveDate>> {
    match optional_text(field, value, MAX_NAME_LEN)? {
        None => Ok(None),
        Some(s) => parse_date(field, &s).map(Some),
    }
}

/// A bare `YYYY-MM-DD`, or a full RFC 3339 timestamp reduced to its UTC date.
fn parse_date(field: &str, raw: &str) -> ValidationResult<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .map_err(|_| ValidationError::invalid_format(field, "expected YYYY-MM-DD"))
}

/// Parses an RFC 3339 timestamp or a bare `YYYY-MM-DD`.
///
/// A bare date resolves to the start of that day, or to its last instant
/// when `end_of_day` is set (used for inclusive range ends).
pub fn parse_timestamp(field: &str, raw: &str, end_of_day: bool) -> ValidationResult<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ValidationError::invalid_format(field, "expected an RFC 3339 timestamp or YYYY-MM-DD")
    })?;

    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        Some(NaiveTime::MIN)
    };

    time.map(|t| date.and_time(t).and_utc())
        .ok_or_else(|| ValidationError::invalid_format(field, "invalid time of day"))
}

fn optional_timestamp(field: &str, value: Option<&Value>) -> ValidationResult<Option<DateTime<Utc>>> {
    match optional_text(field, value, MAX_NAME_LEN)? {
        None => Ok(None),
        Some(s) => parse_timestamp(field, &s, false).map(Some),
    }
}

fn serial_code(field: &str, value: &Value) -> ValidationResult<String> {
    let code = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return Err(ValidationError::invalid_format(field, "must be text")),
    };

    if code.is_empty() {
        return Err(ValidationError::required(field));
    }

    if code.chars().count() > MAX_SERIAL_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_SERIAL_CODE_LEN,
        });
    }

    Ok(code)
}

/// Optional serial code. Blank text counts as absent.
fn optional_serial_code(field: &str, value: Option<&Value>) -> ValidationResult<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(v) => serial_code(field, v).map(Some),
    }
}

fn serial_codes(field: &str, value: Option<&Value>) -> ValidationResult<Vec<String>> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ValidationError::invalid_format(field, "must be a list")),
    };

    let mut seen = HashSet::with_capacity(items.len());
    let mut codes = Vec::with_capacity(items.len());

    for item in items {
        let code = serial_code(field, item)?;
        if !seen.insert(code.clone()) {
            return Err(ValidationError::Duplicate {
                field: field.to_string(),
                value: code,
            });
        }
        codes.push(code);
    }

    Ok(codes)
}

// =============================================================================
// Catalog Validators
// =============================================================================

/// Validates a product payload (create and update share the rules).
///
/// ## Rules
/// - `name` required, at most 100 characters
/// - `categoryId` required integer
/// - `stockMin` required, `>= 0`
/// - `stockMax` required, `>= stockMin`
/// - `tracksSerials` optional flag, defaults to `false`
pub fn validate_new_product(raw: &RawProduct) -> ValidationResult<NewProduct> {
    let name = required_text("name", raw.name.as_ref(), MAX_NAME_LEN)?;
    let description = optional_text("description", raw.description.as_ref(), MAX_TEXT_LEN)?;
    let category_id = required_int("categoryId", raw.category_id.as_ref())?;

    let stock_min = required_int("stockMin", raw.stock_min.as_ref())?;
    if stock_min < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "stockMin".to_string(),
        });
    }

    let stock_max = required_int("stockMax", raw.stock_max.as_ref())?;
    if stock_max < stock_min {
        return Err(ValidationError::MustNotBeLessThan {
            field: "stockMax".to_string(),
            other: "stockMin".to_string(),
        });
    }

    let tracks_serials = flag("tracksSerials", raw.tracks_serials.as_ref())?;

    Ok(NewProduct {
        name,
        description,
        category_id,
        stock_min,
        stock_max,
        tracks_serials,
    })
}

/// Validates a product update. Same rules as creation.
pub fn validate_product_update(raw: &RawProduct) -> ValidationResult<NewProduct> {
    validate_new_product(raw)
}

pub fn validate_new_category(raw: &RawCategory) -> ValidationResult<NewCategory> {
    Ok(NewCategory {
        name: required_text("name", raw.name.as_ref(), MAX_NAME_LEN)?,
        description: optional_text("description", raw.description.as_ref(), MAX_TEXT_LEN)?,
    })
}

/// Validates a category update. An absent `status` keeps the current one.
pub fn validate_category_update(raw: &RawCategory) -> ValidationResult<CategoryUpdate> {
    Ok(CategoryUpdate {
        name: required_text("name", raw.name.as_ref(), MAX_NAME_LEN)?,
        description: optional_text("description", raw.description.as_ref(), MAX_TEXT_LEN)?,
        status: status("status", raw.status.as_ref())?,
    })
}

// =============================================================================
// Account Validators
// =============================================================================

pub fn validate_new_user(raw: &RawUser) -> ValidationResult<NewUser> {
    Ok(NewUser {
        login: required_text("login", raw.login.as_ref(), MAX_ACCOUNT_FIELD_LEN)?,
        name: required_text("name", raw.name.as_ref(), MAX_ACCOUNT_FIELD_LEN)?,
        surname: required_text("surname", raw.surname.as_ref(), MAX_ACCOUNT_FIELD_LEN)?,
        password: required_text("password", raw.password.as_ref(), MAX_PASSWORD_LEN)?,
        role: role("roleId", raw.role_id.as_ref())?,
    })
}

/// Validates a user update. Every field is required, including `status`.
pub fn validate_user_update(raw: &RawUser) -> ValidationResult<UserUpdate> {
    let login = required_text("login", raw.login.as_ref(), MAX_ACCOUNT_FIELD_LEN)?;
    let name = required_text("name", raw.name.as_ref(), MAX_ACCOUNT_FIELD_LEN)?;
    let surname = required_text("surname", raw.surname.as_ref(), MAX_ACCOUNT_FIELD_LEN)?;
    let role = role("roleId", raw.role_id.as_ref())?;
    let status = status("status", raw.status.as_ref())?
        .ok_or_else(|| ValidationError::required("status"))?;

    Ok(UserUpdate {
        login,
        name,
        surname,
        role,
        status,
    })
}

pub fn validate_login(raw: &RawLogin) -> ValidationResult<Credentials> {
    Ok(Credentials {
        login: required_text("login", raw.login.as_ref(), MAX_ACCOUNT_FIELD_LEN)?,
        password: required_text("password", raw.password.as_ref(), MAX_PASSWORD_LEN)?,
    })
}

pub fn validate_password_reset(raw: &RawPasswordReset) -> ValidationResult<PasswordReset> {
    Ok(PasswordReset {
        login: required_text("login", raw.login.as_ref(), MAX_ACCOUNT_FIELD_LEN)?,
        new_password: required_text("newPassword", raw.new_password.as_ref(), MAX_PASSWORD_LEN)?,
    })
}

// =============================================================================
// Stock Validators
// =============================================================================

/// Validates a batch registration.
///
/// Serial-count agreement with `quantity` depends on the product, so it is
/// checked by the ledger, not here.
pub fn validate_new_batch(raw: &RawBatch) -> ValidationResult<NewBatch> {
    let product_id = required_int("productId", raw.product_id.as_ref())?;
    let quantity = positive_int("quantity", raw.quantity.as_ref())?;
    let entry_date = optional_timestamp("entryDate", raw.entry_date.as_ref())?;
    let expiry_date = optional_date("expiryDate", raw.expiry_date.as_ref())?;
    let notes = optional_text("notes", raw.notes.as_ref(), MAX_TEXT_LEN)?;
    let serial_codes = serial_codes("serialNumbers", raw.serial_numbers.as_ref())?;

    Ok(NewBatch {
        product_id,
        quantity,
        entry_date,
        expiry_date,
        notes,
        serial_codes,
    })
}

/// Validates a movement registration.
///
/// ## Rules
/// - `batchId` required integer
/// - `kind` ∈ {Entrada, Salida}
/// - `quantity` required, `> 0`
/// - `serialCode` optional text or number, at most 30 characters
pub fn validate_new_movement(raw: &RawMovement) -> ValidationResult<NewMovement> {
    let batch_id = required_int("batchId", raw.batch_id.as_ref())?;

    let kind_text = required_text("kind", raw.kind.as_ref(), MAX_NAME_LEN)?;
    let kind = MovementKind::parse(&kind_text).ok_or_else(|| ValidationError::NotAllowed {
        field: "kind".to_string(),
        allowed: vec!["Entrada".to_string(), "Salida".to_string()],
    })?;

    let quantity = positive_int("quantity", raw.quantity.as_ref())?;
    let notes = optional_text("notes", raw.notes.as_ref(), MAX_TEXT_LEN)?;

    let serial_code = optional_serial_code("serialCode", raw.serial_code.as_ref())?;

    Ok(NewMovement {
        batch_id,
        kind,
        quantity,
        notes,
        serial_code,
    })
}

/// Validates optional report bounds. A bare end date includes its whole day.
pub fn validate_date_range(start: Option<&str>, end: Option<&str>) -> ValidationResult<DateRange> {
    let start = match start.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Some(parse_timestamp("startDate", s, false)?),
        None => None,
    };
    let end = match end.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Some(parse_timestamp("endDate", s, true)?),
        None => None,
    };

    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(ValidationError::MustNotBeLessThan {
                field: "endDate".to_string(),
                other: "startDate".to_string(),
            });
        }
    }

    Ok(DateRange { start, end })
}

// =============================================================================
// Unit Tests
// =============================================================================
