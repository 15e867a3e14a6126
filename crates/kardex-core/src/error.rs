//! # Error Types
//!
//! Domain-specific error types for kardex-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kardex-core errors (this file)                                        │
//! │  ├── CoreError        - Umbrella for the two below                     │
//! │  ├── ValidationError  - Malformed or missing payload fields            │
//! │  └── LedgerError      - Stock rule rejected the operation              │
//! │                                                                         │
//! │  kardex-db errors (separate crate)                                     │
//! │  └── DbError          - Database failures, conflicts, not found        │
//! │                                                                         │
//! │  kardex-api errors (in app)                                            │
//! │  └── ApiError         - What the HTTP client sees                      │
//! │                                                                         │
//! │  Flow: ValidationError / LedgerError → DbError → ApiError → Client     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::MovementKind;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Ledger rule rejection (wraps LedgerError).
    #[error("{0}")]
    Ledger(#[from] LedgerError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when a request payload doesn't meet requirements.
/// Only the first violated rule is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Value must be at least the value of another field.
    #[error("{field} must be greater than or equal to {other}")]
    MustNotBeLessThan { field: String, other: String },

    /// Invalid format (e.g., not an integer, not a date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value inside the same payload (e.g., repeated serial code).
    #[error("{field} '{value}' is repeated")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Creates a Required error for the given field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates an InvalidFormat error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Ledger Error
// =============================================================================

/// Stock-ledger rule violations.
///
/// Raised by [`crate::ledger`] after validation succeeded but the current
/// persisted state does not allow the operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The process-wide stock stop is active.
    ///
    /// ## When This Occurs
    /// - An administrator froze stock changes (e.g., during a physical count)
    /// - Any batch registration or movement arrives while frozen
    #[error("Stock changes are suspended while the stock stop is active")]
    StockStopActive,

    /// Serialized product registered with the wrong number of serial codes.
    #[error("Expected {expected} serial codes, received {received}")]
    SerialCountMismatch { expected: i64, received: usize },

    /// Serial codes supplied for a product that doesn't track them.
    #[error("Product {product_id} does not track serial numbers")]
    SerialsNotTracked { product_id: i64 },

    /// Serialized product movement without a serial code.
    #[error("A serial number is required for this product")]
    SerialRequired,

    /// Serialized product movement with quantity other than one.
    #[error("Serialized products move one unit at a time, requested {requested}")]
    SerialQuantityMustBeOne { requested: i64 },

    /// Serial code unknown, in another batch, or in the wrong state.
    ///
    /// ## When This Occurs
    /// ```text
    /// Salida  needs the unit Active   (in stock)
    /// Entrada needs the unit Inactive (dispensed)
    /// ```
    #[error("Serial number {code} is not available for {kind}")]
    SerialUnavailable { code: String, kind: MovementKind },

    /// Outbound quantity larger than the batch's current quantity.
    #[error("Requested {requested} exceeds current batch quantity {available}")]
    ExceedsCurrent { requested: i64, available: i64 },

    /// Inbound return on a batch nothing has left yet.
    #[error("There are no dispensed units to return to this batch")]
    NothingToReturn,

    /// Inbound return larger than what has left the batch.
    #[error("Requested {requested} exceeds the {dispensed} units dispensed from this batch")]
    ExceedsDispensed { requested: i64, dispensed: i64 },
}

impl LedgerError {
    /// Whether this rejection is a policy decision (forbidden) rather than a
    /// bad request.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, LedgerError::StockStopActive)
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("nombre");
        assert_eq!(err.to_string(), "nombre is required");

        let err = ValidationError::MustNotBeLessThan {
            field: "stockMaximo".to_string(),
            other: "stockMinimo".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "stockMaximo must be greater than or equal to stockMinimo"
        );
    }

    #[test]
    fn test_ledger_error_messages() {
        let err = LedgerError::SerialUnavailable {
            code: "A1".to_string(),
            kind: MovementKind::Salida,
        };
        assert_eq!(err.to_string(), "Serial number A1 is not available for Salida");

        let err = LedgerError::ExceedsCurrent {
            requested: 12,
            available: 10,
        };
        assert_eq!(
            err.to_string(),
            "Requested 12 exceeds current batch quantity 10"
        );
    }

    #[test]
    fn test_only_stock_stop_is_forbidden() {
        assert!(LedgerError::StockStopActive.is_forbidden());
        assert!(!LedgerError::NothingToReturn.is_forbidden());
    }

    #[test]
    fn test_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("usuario").into();
        assert!(matches!(core_err, CoreError::Validation(_)));

        let core_err: CoreError = LedgerError::SerialRequired.into();
        assert!(matches!(core_err, CoreError::Ledger(_)));
    }
}
