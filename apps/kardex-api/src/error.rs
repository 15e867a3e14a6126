//! # API Error Type
//!
//! Unified error type for axum handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Kardex API                             │
//! │                                                                         │
//! │  Handler  ──► Result<T, ApiError>                                       │
//! │                    ▲                                                    │
//! │     ValidationError ┤ 400 VALIDATION_ERROR                              │
//! │     LedgerError    ─┤ 400 LEDGER_REJECTED  (stock stop: 403 FORBIDDEN)  │
//! │     DbError        ─┤ 404 NOT_FOUND / 409 CONFLICT / 500 INTERNAL       │
//! │     Auth failures  ─┤ 401 UNAUTHENTICATED / 403 FORBIDDEN               │
//! │     Body rejection ─┘ 400 VALIDATION_ERROR                              │
//! │                                                                         │
//! │  IntoResponse ──► HTTP status + {"code": "...", "message": "..."}       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures are logged with their details and answered with a
//! generic message.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kardex_core::{LedgerError, ValidationError};
use kardex_db::DbError;
use serde::Serialize;
use tracing::{error, warn};

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error returned from every handler.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Product not found: 42"
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
}

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Payload failed validation (400)
    ValidationError,

    /// Stock rules rejected the operation (400)
    LedgerRejected,

    /// Missing, invalid or expired token, or bad credentials (401)
    Unauthenticated,

    /// Role not allowed, inactive user or stock stop (403)
    Forbidden,

    /// Resource not found (404)
    NotFound,

    /// Uniqueness or concurrent modification (409)
    Conflict,

    /// Internal server error (500)
    Internal,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: ErrorCode,
    message: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, ErrorCode::ValidationError, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::UNAUTHORIZED, ErrorCode::Unauthenticated, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::FORBIDDEN, ErrorCode::Forbidden, message)
    }

    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        ApiError::new(
            StatusCode::NOT_FOUND,
            ErrorCode::NotFound,
            format!("{resource} not found: {id}"),
        )
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::CONFLICT, ErrorCode::Conflict, message)
    }

    pub fn internal() -> Self {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::Internal,
            "Internal server error",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        if err.is_forbidden() {
            ApiError::forbidden(err.to_string())
        } else {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                ErrorCode::LedgerRejected,
                err.to_string(),
            )
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, id),
            DbError::Ledger(rule) => rule.into(),
            DbError::UniqueViolation { field, value } => {
                ApiError::conflict(format!("{field} '{value}' already exists"))
            }
            DbError::Conflict(detail) => {
                warn!(detail = %detail, "Write lost a concurrent race");
                ApiError::conflict("The resource was modified concurrently, try again")
            }
            DbError::ForeignKeyViolation { message } => {
                error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::CheckViolation { message } => {
                error!("Check constraint violation: {}", message);
                ApiError::validation("Value out of range")
            }
            other => {
                error!(error = %other, "Database operation failed");
                ApiError::internal()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_stop_is_forbidden() {
        let err: ApiError = DbError::Ledger(LedgerError::StockStopActive).into();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[test]
    fn test_other_ledger_rejections_are_bad_requests() {
        let err: ApiError = DbError::Ledger(LedgerError::ExceedsCurrent {
            requested: 8,
            available: 3,
        })
        .into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, ErrorCode::LedgerRejected);
        assert_eq!(err.message, "Requested 8 exceeds current batch quantity 3");
    }

    #[test]
    fn test_db_error_mapping() {
        let err: ApiError = DbError::not_found("Product", 9).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Product not found: 9");

        let err: ApiError = DbError::duplicate("users.login", "ana").into();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let err: ApiError = DbError::QueryFailed("syntax error near SELEC".into()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Internal server error");
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::LedgerRejected).unwrap();
        assert_eq!(json, "\"LEDGER_REJECTED\"");
    }
}
