//! HTTP server layer for picdrop.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │     POST /api/v1/uploads[/{name}]   GET /api/v1/uploads/{f}     │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌────────┐  │
//! │  │  handlers   │  │  accounts   │  │    auth     │  │ routes │  │
//! │  │  (uploads)  │  │   (stubs)   │  │  (bearer)   │  │        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────┘  └────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//!                        ingest::IngestService
//! ```

pub mod accounts;
pub mod auth;
pub mod handlers;
pub mod routes;

pub use accounts::{
    info_handler, login_handler, profile_handler, register_handler, InfoResponse,
    MessageResponse, ProfileResponse, TokenResponse,
};
pub use auth::{bearer_auth_middleware, bearer_token, AuthError, Claims, TokenAuth};
pub use handlers::{
    health_handler, named_upload_handler, not_found_handler, public_url, serve_upload_handler,
    upload_handler, AppState, ErrorResponse, HealthResponse, UploadResponse,
};
pub use routes::{create_router, RouterConfig};
