//! `POST /api/login`

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use kardex_core::validation::{validate_login, RawLogin};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::extract::AppJson;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Exchanges credentials for a bearer token.
///
/// ## Errors
/// - 401 for an unknown login or a wrong password
/// - 403 when the password is right but the user is inactive
async fn login(
    State(state): State<AppState>,
    AppJson(raw): AppJson<RawLogin>,
) -> ApiResult<Json<TokenResponse>> {
    let credentials = validate_login(&raw)?;

    let user = state
        .db
        .users()
        .verify_credentials(&credentials.login, &credentials.password)
        .await?
        .ok_or_else(|| {
            warn!(login = %credentials.login, "Login failed");
            ApiError::unauthenticated("Invalid credentials")
        })?;

    if !user.is_active() {
        warn!(login = %user.login, "Inactive user tried to log in");
        return Err(ApiError::forbidden("Access denied, inactive user"));
    }

    let token = state.jwt.issue(&user)?;
    info!(user_id = user.id, login = %user.login, "User logged in");

    Ok(Json(TokenResponse { token }))
}
