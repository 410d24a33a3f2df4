//! Upload acceptance rules.
//!
//! The content type is checked as soon as a file part's headers are read,
//! before any byte is written. The size limit is enforced while the body
//! streams, so an oversized upload is cut off at `max_bytes + chunk` rather
//! than buffered in full.

use crate::error::UploadError;

/// Default maximum upload size (5 MiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 5 * 1024 * 1024;

/// Raster image types accepted by default.
pub const DEFAULT_ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Content type assumed when a file part does not declare one.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Limits applied to every upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    allowed_types: Vec<String>,
    max_bytes: u64,
}

impl UploadPolicy {
    /// Create a policy. Allowed types are compared case-insensitively.
    pub fn new<I, S>(allowed_types: I, max_bytes: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_types: allowed_types
                .into_iter()
                .map(|t| t.as_ref().trim().to_ascii_lowercase())
                .collect(),
            max_bytes,
        }
    }

    /// Replace the size limit.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn allowed_types(&self) -> &[String] {
        &self.allowed_types
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Whether a declared content type is on the allow-list.
    ///
    /// Parameters such as `; charset=...` are ignored.
    pub fn is_allowed(&self, content_type: &str) -> bool {
        let essence = essence(content_type);
        self.allowed_types.iter().any(|allowed| *allowed == essence)
    }

    /// Reject a file part whose declared type is not allowed.
    pub fn check_content_type(&self, field: &str, content_type: &str) -> Result<(), UploadError> {
        if self.is_allowed(content_type) {
            Ok(())
        } else {
            Err(UploadError::DisallowedType {
                field: field.to_string(),
                content_type: content_type.to_string(),
            })
        }
    }

    /// Reject a running byte count once it passes the limit.
    pub fn check_size(&self, field: &str, received: u64) -> Result<(), UploadError> {
        if received > self.max_bytes {
            Err(UploadError::Oversized {
                field: Some(field.to_string()),
                limit: self.max_bytes,
                received: Some(received),
            })
        } else {
            Ok(())
        }
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_TYPES, DEFAULT_MAX_UPLOAD_SIZE)
    }
}

/// `type/subtype` part of a media type, lowercased.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether `value` looks like a `type/subtype` media type.
pub fn is_media_type(value: &str) -> bool {
    match value.trim().split_once('/') {
        Some((kind, subtype)) => {
            !kind.is_empty()
                && !subtype.is_empty()
                && !subtype.contains('/')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
