//! Bearer token authentication for picdrop.
//!
//! Tokens are opaque to clients. Internally a token is the hex-encoded JSON
//! claims followed by an HMAC-SHA256 over those claims:
//!
//! ```text
//! token = hex(claims_json) "." hex(HMAC-SHA256(secret_key, claims_json))
//! ```
//!
//! Claims carry the user id, role and an expiry timestamp (Unix seconds).
//!
//! # Security Properties
//!
//! - **Tamper-evident**: any change to the claims invalidates the MAC
//! - **Time-limited**: tokens expire after a configurable TTL
//! - **Constant-time comparison**: MACs are compared with `subtle`
//!
//! # Example
//!
//! ```rust
//! use picdrop::server::auth::TokenAuth;
//! use std::time::Duration;
//!
//! let auth = TokenAuth::new("my-secret-key");
//! let (token, _expiry) = auth.issue(1, "user", Duration::from_secs(3600));
//!
//! let claims = auth.verify(&token).unwrap();
//! assert_eq!(claims.id, 1);
//! assert_eq!(claims.role, "user");
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::handlers::ErrorResponse;

// =============================================================================
// Types
// =============================================================================

/// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Identity carried by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User identifier
    pub id: u64,

    /// User role
    pub role: String,

    /// Expiry timestamp (Unix epoch seconds)
    pub exp: u64,
}

/// Authentication error types.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// No `Authorization: Bearer` header
    MissingToken,

    /// Token is not `hex.hex` or the claims do not parse
    MalformedToken,

    /// MAC does not match the claims
    InvalidSignature,

    /// Token has expired
    Expired {
        /// When the token expired
        expired_at: u64,
        /// Current time
        current_time: u64,
    },
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing bearer token"),
            AuthError::MalformedToken => write!(f, "Malformed token"),
            AuthError::InvalidSignature => write!(f, "Invalid token"),
            AuthError::Expired {
                expired_at,
                current_time,
            } => write!(
                f,
                "Token expired at {} (current time: {})",
                expired_at, current_time
            ),
        }
    }
}

impl std::error::Error for AuthError {}

impl AuthError {
    fn error_type(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired { .. } => "token_expired",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = StatusCode::UNAUTHORIZED;
        let error_type = self.error_type();

        // A bad MAC could be an attack; everything else is routine
        match &self {
            AuthError::InvalidSignature => {
                warn!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    self
                );
            }
            _ => {
                debug!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    self
                );
            }
        }

        let message = match &self {
            // Expiry details stay in the log
            AuthError::Expired { .. } => "Token expired".to_string(),
            other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// =============================================================================
// Token Authentication
// =============================================================================

/// Issues and verifies HMAC-signed bearer tokens.
#[derive(Clone)]
pub struct TokenAuth {
    /// Secret key for HMAC computation
    secret_key: Vec<u8>,
}

impl TokenAuth {
    /// Create a new authenticator with the given secret key.
    ///
    /// The key should be at least 32 bytes for security.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
        }
    }

    /// Issue a token for a user, valid for `ttl`.
    ///
    /// Returns the token and its expiry timestamp.
    pub fn issue(&self, id: u64, role: &str, ttl: Duration) -> (String, u64) {
        let claims = Claims {
            id,
            role: role.to_string(),
            exp: unix_now().saturating_add(ttl.as_secs()),
        };
        (self.issue_claims(&claims), claims.exp)
    }

    /// Issue a token for explicit claims.
    pub fn issue_claims(&self, claims: &Claims) -> String {
        let payload = serde_json::to_vec(claims).unwrap_or_default();
        let signature = self.compute_signature(&payload);
        format!("{}.{}", hex::encode(&payload), hex::encode(signature))
    }

    /// Verify a token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let (payload_hex, signature_hex) =
            token.split_once('.').ok_or(AuthError::MalformedToken)?;

        let payload = hex::decode(payload_hex).map_err(|_| AuthError::MalformedToken)?;
        let provided_sig = hex::decode(signature_hex).map_err(|_| AuthError::MalformedToken)?;

        // Constant-time comparison
        let expected_sig = self.compute_signature(&payload);
        if !bool::from(provided_sig.ct_eq(&expected_sig)) {
            return Err(AuthError::InvalidSignature);
        }

        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| AuthError::MalformedToken)?;

        let current_time = unix_now();
        if current_time > claims.exp {
            return Err(AuthError::Expired {
                expired_at: claims.exp,
                current_time,
            });
        }

        Ok(claims)
    }

    /// Compute the HMAC-SHA256 of a payload.
    fn compute_signature(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Axum middleware requiring a valid bearer token.
///
/// On success the verified [`Claims`] are inserted into the request
/// extensions for handlers to read.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware, routing::get};
/// use picdrop::server::auth::{TokenAuth, bearer_auth_middleware};
///
/// let auth = TokenAuth::new("secret-key");
/// let app = Router::new()
///     .route("/users/profile", get(profile_handler))
///     .route_layer(middleware::from_fn_with_state(auth, bearer_auth_middleware));
/// ```
pub async fn bearer_auth_middleware(
    State(auth): State<TokenAuth>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AuthError::MissingToken)?;

    let claims = auth.verify(token)?;
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

// =============================================================================
// Tests
// =============================================================================
