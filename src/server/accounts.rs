//! Account endpoints: stub registration, login, and user lookups.
//!
//! There is no user store. Registration is acknowledged without persisting
//! anything and login always issues a token for the fixed demo user.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Serialize;
use tracing::info;

use super::auth::Claims;
use super::handlers::AppState;

/// Id of the user every login is issued for.
pub const DEMO_USER_ID: u64 = 1;

/// Role of the user every login is issued for.
pub const DEMO_USER_ROLE: &str = "user";

/// Plain acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Issued bearer token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Identity of the authenticated caller.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: u64,
    pub role: String,
}

/// Public liveness payload.
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub msg: String,
}

/// `POST {api}/auth/register`
///
/// The request body is ignored.
pub async fn register_handler() -> (StatusCode, Json<MessageResponse>) {
    (
        StatusCode::OK,
        Json(MessageResponse {
            message: "Register OK".to_string(),
        }),
    )
}

/// `POST {api}/auth/login`
///
/// Credentials are not checked. Returns a token for the demo user.
pub async fn login_handler(State(state): State<AppState>) -> Json<TokenResponse> {
    let (token, expires_at) = state
        .auth
        .issue(DEMO_USER_ID, DEMO_USER_ROLE, state.token_ttl);

    info!(user_id = DEMO_USER_ID, expires_at, "Token issued");

    Json(TokenResponse { token })
}

/// `GET {api}/users/profile`
///
/// Requires a bearer token; the auth middleware supplies the claims.
pub async fn profile_handler(Extension(claims): Extension<Claims>) -> Json<ProfileResponse> {
    info!(user_id = claims.id, role = %claims.role, "Profile requested");

    Json(ProfileResponse {
        id: claims.id,
        role: claims.role,
    })
}

/// `GET {api}/users/info`
pub async fn info_handler() -> Json<InfoResponse> {
    Json(InfoResponse {
        msg: "ok".to_string(),
    })
}
