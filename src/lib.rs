//! # picdrop
//!
//! A small HTTP API that accepts multipart image uploads, stores them on the
//! local filesystem and serves them back, alongside stub account endpoints
//! that issue signed bearer tokens.
//!
//! ## Features
//!
//! - **Streaming ingestion**: uploads are written to disk as they arrive, with
//!   the size limit enforced chunk by chunk
//! - **Safe naming**: generated `{millis}-{suffix}{ext}` names, or sanitized
//!   client-requested names
//! - **Atomic storage**: bytes land in a temporary file and are renamed into
//!   place only once accepted
//! - **Stable errors**: every failure becomes a JSON `{ error, code? }` body
//! - **Authentication**: HMAC-SHA256 bearer tokens
//!
//! ## Architecture
//!
//! - [`ingest`] - Field selection, validation, naming and storage
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//! - [`error`] - Upload error taxonomy
//!
//! ## Example
//!
//! ```rust,no_run
//! use picdrop::{create_router, IngestService, RouterConfig, UploadStorage};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let storage = UploadStorage::open("uploads")?;
//!     let router = create_router(
//!         IngestService::with_defaults(storage),
//!         RouterConfig::new("change-me"),
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod ingest;
pub mod server;

// Re-export commonly used types
pub use config::{Cli, Command, ServeConfig, TokenConfig, TokenOutputFormat};
pub use error::UploadError;
pub use ingest::{
    derive_filename, is_stored_filename, DerivedName, FieldSelector, IngestService, NamingMode,
    StoredArtifact, UploadPolicy, UploadStorage, DEFAULT_ALLOWED_TYPES, DEFAULT_FILE_FIELDS,
    DEFAULT_MAX_UPLOAD_SIZE,
};
pub use server::{
    create_router, health_handler, AppState, AuthError, Claims, ErrorResponse, HealthResponse,
    RouterConfig, TokenAuth, UploadResponse,
};
