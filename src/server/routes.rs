//! Router configuration for picdrop.
//!
//! This module defines the HTTP routes and applies middleware for bearer
//! authentication, request body limits and CORS.
//!
//! # Route Structure
//!
//! ```text
//! /health                           - Health check (public)
//! /api/{v}/auth/register            - Stub registration (public)
//! /api/{v}/auth/login               - Token issuance (public)
//! /api/{v}/users/info               - Liveness payload (public)
//! /api/{v}/users/profile            - Caller identity (bearer token)
//! {uploads}                         - POST: upload, generated name
//! {uploads}/{name}                  - POST: upload, requested name
//!                                     GET: retrieve a stored file
//! ```
//!
//! `{uploads}` defaults to `/api/{v}/uploads`.
//!
//! # Example
//!
//! ```ignore
//! use picdrop::ingest::{IngestService, UploadStorage};
//! use picdrop::server::routes::{create_router, RouterConfig};
//!
//! let storage = UploadStorage::open("uploads")?;
//! let ingest = IngestService::with_defaults(storage);
//!
//! let config = RouterConfig::new("my-secret-key")
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(ingest, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::accounts::{info_handler, login_handler, profile_handler, register_handler};
use super::auth::{bearer_auth_middleware, TokenAuth};
use super::handlers::{
    health_handler, named_upload_handler, not_found_handler, serve_upload_handler,
    upload_handler, AppState,
};
use crate::ingest::IngestService;

/// Room for multipart framing on top of the file size limit.
pub const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Default API version segment.
pub const DEFAULT_API_VERSION: &str = "v1";

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Secret key for bearer token signing
    pub token_secret: String,

    /// Lifetime of issued tokens
    pub token_ttl: Duration,

    /// API version segment, routes live under `/api/{version}`
    pub api_version: String,

    /// Upload route prefix (None = `/api/{version}/uploads`)
    pub upload_public_path: Option<String>,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration with the given token secret.
    ///
    /// By default:
    /// - API version is `v1`
    /// - Uploads live under `/api/v1/uploads`
    /// - Tokens are valid for 1 hour
    /// - CORS allows any origin
    /// - Tracing is enabled
    pub fn new(token_secret: impl Into<String>) -> Self {
        Self {
            token_secret: token_secret.into(),
            token_ttl: Duration::from_secs(3600),
            api_version: DEFAULT_API_VERSION.to_string(),
            upload_public_path: None,
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set the API version segment.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Set the prefix uploads are accepted and served under.
    pub fn with_upload_public_path(mut self, path: impl Into<String>) -> Self {
        self.upload_public_path = Some(path.into());
        self
    }

    /// Set the lifetime of issued tokens.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    /// Pass None (or don't call this method) to allow any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// `/api/{version}`
    pub fn api_prefix(&self) -> String {
        format!("/api/{}", self.api_version)
    }

    /// Upload prefix without a trailing slash.
    pub fn upload_prefix(&self) -> String {
        match &self.upload_public_path {
            Some(path) => path.trim_end_matches('/').to_string(),
            None => format!("{}/uploads", self.api_prefix()),
        }
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// This function builds the complete Axum router with:
/// - Public routes (health, register, login, info)
/// - The bearer-protected profile route
/// - Upload and retrieval routes with a request body limit
/// - CORS configuration
/// - Request tracing (optional)
pub fn create_router(ingest: IngestService, config: RouterConfig) -> Router {
    let upload_prefix = config.upload_prefix();
    let api_prefix = config.api_prefix();

    let body_limit = ingest
        .policy()
        .max_bytes()
        .saturating_add(MULTIPART_OVERHEAD);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    let auth = TokenAuth::new(&config.token_secret);
    let state = AppState::new(ingest, upload_prefix.clone(), auth.clone())
        .with_token_ttl(config.token_ttl);

    let cors = build_cors_layer(&config);

    // `{name}` is the requested name on POST and the stored name on GET
    let upload_routes = Router::new()
        .route(&upload_prefix, post(upload_handler))
        .route(&format!("{}/", upload_prefix), post(upload_handler))
        .route(
            &format!("{}/{{name}}", upload_prefix),
            post(named_upload_handler).get(serve_upload_handler),
        )
        .layer(DefaultBodyLimit::max(body_limit));

    let protected_routes = Router::new()
        .route(&format!("{}/users/profile", api_prefix), get(profile_handler))
        .route_layer(middleware::from_fn_with_state(auth, bearer_auth_middleware));

    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route(&format!("{}/auth/register", api_prefix), post(register_handler))
        .route(&format!("{}/auth/login", api_prefix), post(login_handler))
        .route(&format!("{}/users/info", api_prefix), get(info_handler));

    let router = Router::new()
        .merge(upload_routes)
        .merge(protected_routes)
        .merge(public_routes)
        .fallback(not_found_handler)
        .with_state(state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
