//! JWT authentication module.
//!
//! Issues tokens at login and turns the `Authorization: Bearer` header back
//! into an [`AuthUser`] on every protected request.
//!
//! ```text
//! POST /api/login ──► verify password ──► JwtManager::issue(user) ──► {token}
//!
//! GET /api/lotes
//!   Authorization: Bearer eyJ...
//!        │
//!        ▼
//!   AuthUser extractor ── missing / bad / expired ──► 401
//!        │
//!        ▼
//!   auth.require(&[..]) ── role not allowed ──► 403
//! ```

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use kardex_core::{Role, User};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Login name, for logs
    pub login: String,

    /// Role id at the time the token was issued
    pub role_id: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// JWT token manager.
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: impl Into<String>, lifetime_secs: i64) -> Self {
        JwtManager {
            secret: secret.into(),
            lifetime_secs,
        }
    }

    /// Generate a token for a user that just logged in.
    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        self.issue_at(user, Utc::now().timestamp())
    }

    fn issue_at(&self, user: &User, now: i64) -> Result<String, ApiError> {
        let claims = Claims {
            sub: user.id.to_string(),
            login: user.login.clone(),
            role_id: user.role_id,
            iat: now,
            exp: now + self.lifetime_secs,
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| {
            tracing::error!("Failed to generate token: {}", e);
            ApiError::internal()
        })
    }

    /// Validate and decode a token.
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            debug!(error = %e, "Rejected token");
            ApiError::unauthenticated("Invalid or expired token")
        })?;

        Ok(token_data.claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Bearer token of a request, if the header is present and well formed.
pub fn bearer_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer_token)
}

// =============================================================================
// AuthUser Extractor
// =============================================================================

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub login: String,
    pub role: Role,
}

impl AuthUser {
    /// Resolves validated claims into a caller.
    pub fn from_claims(claims: Claims) -> Result<Self, ApiError> {
        let user_id = claims
            .sub
            .parse()
            .map_err(|_| ApiError::unauthenticated("Invalid or expired token"))?;
        let role = Role::from_id(claims.role_id)
            .ok_or_else(|| ApiError::unauthenticated("Invalid or expired token"))?;

        Ok(AuthUser {
            user_id,
            login: claims.login,
            role,
        })
    }

    /// Fails with 403 unless the caller holds one of `roles`.
    pub fn require(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            debug!(login = %self.login, role = self.role.name(), "Role not allowed");
            Err(ApiError::forbidden("Access denied for this role"))
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_from_headers(&parts.headers)
            .ok_or_else(|| ApiError::unauthenticated("Missing bearer token"))?;

        AuthUser::from_claims(state.jwt.validate(token)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kardex_core::RecordStatus;

    fn user(role_id: i64) -> User {
        User {
            id: 7,
            login: "ana".to_string(),
            name: "Ana".to_string(),
            surname: "López".to_string(),
            role_id,
            role_name: None,
            status: RecordStatus::Active,
        }
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret", 3600);
        let token = manager.issue(&user(2)).unwrap();

        let auth = AuthUser::from_claims(manager.validate(&token).unwrap()).unwrap();
        assert_eq!(auth.user_id, 7);
        assert_eq!(auth.login, "ana");
        assert_eq!(auth.role, Role::Supervisor);
    }

    #[test]
    fn test_wrong_secret_and_expired_tokens_are_rejected() {
        let manager = JwtManager::new("test-secret", 3600);
        let other = JwtManager::new("other-secret", 3600);
        let token = other.issue(&user(1)).unwrap();
        assert!(manager.validate(&token).is_err());

        let long_ago = Utc::now().timestamp() - 10_000;
        let expired = manager.issue_at(&user(1), long_ago).unwrap();
        let err = manager.validate(&expired).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_unknown_role_is_unauthenticated() {
        let manager = JwtManager::new("test-secret", 3600);
        let token = manager.issue(&user(9)).unwrap();
        assert!(AuthUser::from_claims(manager.validate(&token).unwrap()).is_err());
    }

    #[test]
    fn test_require() {
        let operator = AuthUser {
            user_id: 3,
            login: "op".to_string(),
            role: Role::Operator,
        };
        assert!(operator.require(&Role::ALL).is_ok());
        let err = operator
            .require(&[Role::Administrator, Role::Supervisor])
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}
