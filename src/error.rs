use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use thiserror::Error;

/// Failures of the upload ingestion pipeline.
///
/// Every variant is turned into a JSON response by the error mapping in
/// [`crate::server::handlers`]; the data carried here feeds the log entry,
/// never the client-facing body.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Neither of the accepted file fields was present
    #[error("No file uploaded")]
    MissingFile {
        /// Field names that would have been accepted
        accepted: Vec<String>,
    },

    /// Declared content type is not in the allow-list
    #[error("Only image files are allowed")]
    DisallowedType {
        /// Form field the file arrived under
        field: String,
        /// Content type declared by the client
        content_type: String,
    },

    /// Payload exceeded the configured byte limit
    #[error("File too large")]
    Oversized {
        /// Form field being read, if the limit tripped inside a known field
        field: Option<String>,
        /// Configured limit in bytes
        limit: u64,
        /// Bytes counted when the limit tripped, if the field was being counted
        received: Option<u64>,
    },

    /// Filesystem failure while staging or committing the file
    #[error("Storage failure: {0}")]
    Storage(#[from] std::io::Error),

    /// Malformed submission with a caller-supplied status
    #[error("{message}")]
    Validation { status: StatusCode, message: String },

    /// Anything that does not fit the categories above
    #[error("Internal error: {0}")]
    Internal(String),
}

impl UploadError {
    /// Stable identifier used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            UploadError::MissingFile { .. } => "missing_file",
            UploadError::DisallowedType { .. } => "disallowed_type",
            UploadError::Oversized { .. } => "oversized",
            UploadError::Storage(_) => "storage_failure",
            UploadError::Validation { .. } => "validation_failure",
            UploadError::Internal(_) => "internal",
        }
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::MissingFile { .. } | UploadError::DisallowedType { .. } => {
                StatusCode::BAD_REQUEST
            }
            UploadError::Oversized { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::Storage(_) | UploadError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            UploadError::Validation { status, .. } => {
                if status.as_u16() >= 400 {
                    *status
                } else {
                    StatusCode::BAD_REQUEST
                }
            }
        }
    }

    /// Whether the failure was caused by the client rather than the server.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Map a multipart read failure, attributing it to `field` when known.
    ///
    /// A 413 from the reader means the request body limit tripped before a
    /// field-level size check could, so it is reported as `Oversized`.
    pub fn from_multipart(err: MultipartError, field: Option<&str>, limit: u64) -> Self {
        let status = err.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::Oversized {
                field: field.map(str::to_owned),
                limit,
                received: None,
            }
        } else {
            UploadError::Validation {
                status,
                message: err.body_text(),
            }
        }
    }
}

impl From<tempfile::PathPersistError> for UploadError {
    fn from(err: tempfile::PathPersistError) -> Self {
        UploadError::Storage(err.error)
    }
}
