//! Test utilities for integration tests.
//!
//! Helpers for building multipart bodies, routers over scratch storage
//! directories, and reading JSON responses.

use std::path::Path;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;

use picdrop::{create_router, FieldSelector, IngestService, RouterConfig, UploadPolicy, UploadStorage};

pub const TEST_SECRET: &str = "test-secret-key-for-hmac-signing";

pub const UPLOADS: &str = "/api/v1/uploads";

pub const BOUNDARY: &str = "picdrop-integration-boundary";

/// A 1x1 transparent PNG.
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

// =============================================================================
// Multipart Builder
// =============================================================================

/// Builds `multipart/form-data` request bodies.
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file part.
    pub fn file(mut self, field: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body
            .extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                field, filename, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Add a text part.
    pub fn text(mut self, field: &str, value: &str) -> Self {
        self.body
            .extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                field, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.body
    }
}

/// A POST request carrying a multipart body.
pub fn upload_request(uri: &str, body: MultipartBody) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("host", "files.example.com")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body.finish()))
        .unwrap()
}

// =============================================================================
// Router Helpers
// =============================================================================

/// Router over `dir` with the default policy.
pub fn test_router(dir: &Path) -> Router {
    test_router_with_limit(dir, picdrop::DEFAULT_MAX_UPLOAD_SIZE)
}

/// Router over `dir` with a custom size limit.
pub fn test_router_with_limit(dir: &Path, max_bytes: u64) -> Router {
    let storage = UploadStorage::open(dir).unwrap();
    let ingest = IngestService::new(
        storage,
        UploadPolicy::default().with_max_bytes(max_bytes),
        FieldSelector::default(),
    );
    create_router(ingest, RouterConfig::new(TEST_SECRET).with_tracing(false))
}

/// Sorted names of the entries in `dir`.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
