//! HTTP request handlers for the picdrop upload API.
//!
//! # Endpoints
//!
//! - `POST {uploads}` / `POST {uploads}/` - Upload with a generated name
//! - `POST {uploads}/{name}` - Upload under a requested name
//! - `GET {uploads}/{filename}` - Retrieve a stored upload
//! - `GET /health` - Health check endpoint

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, error, warn};
use url::Url;

use super::auth::TokenAuth;
use crate::error::UploadError;
use crate::ingest::{is_stored_filename, IngestService};

/// Client-facing message for every server-side failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Error code attached to oversized uploads.
pub const LIMIT_FILE_SIZE_CODE: &str = "LIMIT_FILE_SIZE";

/// Host used in public URLs when the request carries none.
pub const FALLBACK_HOST: &str = "localhost";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Upload ingestion pipeline
    pub ingest: Arc<IngestService>,

    /// Path prefix under which stored files are publicly reachable
    pub upload_public_path: String,

    /// Token issuer and verifier
    pub auth: TokenAuth,

    /// Lifetime of issued tokens
    pub token_ttl: Duration,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        ingest: IngestService,
        upload_public_path: impl Into<String>,
        auth: TokenAuth,
    ) -> Self {
        Self {
            ingest: Arc::new(ingest),
            upload_public_path: upload_public_path.into(),
            auth,
            token_ttl: Duration::from_secs(3600),
        }
    }

    /// Set the lifetime of issued tokens.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error envelope returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,

    /// Machine-readable error code, when one applies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
        }
    }

    /// Create a new error response with a code.
    pub fn with_code(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
        }
    }
}

/// Successful upload response.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Stored filename
    pub filename: String,

    /// Absolute URL the file can be fetched from
    pub url: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert UploadError to HTTP response.
///
/// Client errors are logged at WARN, server errors at ERROR. Server-side
/// detail (I/O errors, paths) only reaches the log.
impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_kind = self.kind();

        match &self {
            UploadError::DisallowedType {
                field,
                content_type,
            } => warn!(
                error_kind,
                status = status.as_u16(),
                field = %field,
                content_type = %content_type,
                "Upload rejected: {}",
                self
            ),
            UploadError::Oversized {
                field,
                limit,
                received,
            } => warn!(
                error_kind,
                status = status.as_u16(),
                field = field.as_deref().unwrap_or("-"),
                limit_bytes = limit,
                received_bytes = received,
                "Upload rejected: {}",
                self
            ),
            UploadError::Storage(err) => error!(
                error_kind,
                status = status.as_u16(),
                error = %err,
                "Upload failed"
            ),
            UploadError::Internal(detail) => error!(
                error_kind,
                status = status.as_u16(),
                error = %detail,
                "Upload failed"
            ),
            UploadError::MissingFile { accepted } => warn!(
                error_kind,
                status = status.as_u16(),
                accepted_fields = %accepted.join(","),
                "Upload rejected: {}",
                self
            ),
            UploadError::Validation { .. } if self.is_client_error() => warn!(
                error_kind,
                status = status.as_u16(),
                "Upload rejected: {}",
                self
            ),
            UploadError::Validation { .. } => error!(
                error_kind,
                status = status.as_u16(),
                "Upload failed: {}",
                self
            ),
        }

        let body = match &self {
            UploadError::Oversized { .. } => {
                ErrorResponse::with_code(self.to_string(), LIMIT_FILE_SIZE_CODE)
            }
            UploadError::Storage(_) | UploadError::Internal(_) => {
                ErrorResponse::new(INTERNAL_ERROR_MESSAGE)
            }
            UploadError::MissingFile { .. }
            | UploadError::DisallowedType { .. }
            | UploadError::Validation { .. } => ErrorResponse::new(self.to_string()),
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle uploads with a generated filename.
///
/// # Endpoint
///
/// `POST {uploads}`
///
/// # Request
///
/// `multipart/form-data` with the file under `file` (or `image`).
///
/// # Response
///
/// - `201 Created`: `{ "filename": "...", "url": "..." }`
/// - `400 Bad Request`: No file, or a disallowed content type
/// - `413 Payload Too Large`: File exceeds the configured limit
/// - `500 Internal Server Error`: Storage failure
pub async fn upload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), UploadError> {
    store_upload(&state, &headers, multipart, None).await
}

/// Handle uploads under a requested filename.
///
/// # Endpoint
///
/// `POST {uploads}/{name}`
///
/// `name` is sanitized into the stored filename; uploading to the same name
/// again replaces the earlier file.
pub async fn named_upload_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), UploadError> {
    store_upload(&state, &headers, multipart, Some(&name)).await
}

async fn store_upload(
    state: &AppState,
    headers: &HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
    hint: Option<&str>,
) -> Result<(StatusCode, Json<UploadResponse>), UploadError> {
    // A body that is not multipart cannot carry a file field.
    let mut multipart = multipart.map_err(|rejection| {
        debug!(reason = %rejection.body_text(), "Upload request is not multipart");
        UploadError::MissingFile {
            accepted: state.ingest.fields().accepted().to_vec(),
        }
    })?;

    let artifact = state.ingest.ingest(&mut multipart, hint).await?;
    let url = public_url(headers, &state.upload_public_path, &artifact.filename);

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            filename: artifact.filename,
            url,
        }),
    ))
}

/// Serve a stored upload.
///
/// # Endpoint
///
/// `GET {uploads}/{filename}`
///
/// The content type is guessed from the extension. Names that could not
/// have been produced by the upload endpoints get a 404 without touching
/// the filesystem.
pub async fn serve_upload_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    request: Request,
) -> Response {
    if !is_stored_filename(&filename) {
        debug!(filename = %filename, "Refusing to serve invalid upload name");
        return not_found();
    }

    let path = state.ingest.storage().path_for(&filename);
    let response = match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    if response.status() == StatusCode::NOT_FOUND {
        debug!(filename = %filename, "Upload not found");
        return not_found();
    }

    response.into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Not Found"))).into_response()
}

/// Fallback for unmatched routes, in the same JSON envelope as other errors.
pub async fn not_found_handler() -> Response {
    not_found()
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Public URLs
// =============================================================================

/// Build the public URL of a stored file from the request's scheme and host.
///
/// The scheme comes from `X-Forwarded-Proto` when it names http or https,
/// otherwise `http`. A missing or unparseable `Host`, or one carrying more
/// than `host[:port]`, falls back to [`FALLBACK_HOST`].
pub fn public_url(headers: &HeaderMap, public_path: &str, filename: &str) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| value == "http" || value == "https")
        .unwrap_or_else(|| "http".to_string());

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .filter(|value| is_plain_authority(value))
        .unwrap_or(FALLBACK_HOST);

    let path = format!("{}/{}", public_path.trim_end_matches('/'), filename);

    match Url::parse(&format!("{}://{}", scheme, host))
        .or_else(|_| Url::parse(&format!("{}://{}", scheme, FALLBACK_HOST)))
    {
        Ok(mut url) => {
            url.set_path(&path);
            url.to_string()
        }
        Err(_) => format!("{}://{}{}", scheme, FALLBACK_HOST, path),
    }
}

/// Whether a `Host` value is only `host[:port]`, with no userinfo, path,
/// query or fragment.
fn is_plain_authority(host: &str) -> bool {
    !host.is_empty() && !host.contains(['/', '?', '#', '@', '\\'])
}

// =============================================================================
// Tests
// =============================================================================
