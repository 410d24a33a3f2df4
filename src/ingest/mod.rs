//! File ingestion pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        IngestService                            │
//! │                                                                 │
//! │  multipart ──▶ fields ──▶ validation ──▶ storage (stage)        │
//! │                                            │                    │
//! │                           naming ──────────▶ storage (commit)   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`fields`] picks the file part among accepted field names
//! - [`validation`] enforces the content type allow-list and size limit
//! - [`naming`] derives the destination filename
//! - [`storage`] stages bytes to a temporary file and renames on success

pub mod fields;
pub mod naming;
pub mod service;
pub mod storage;
pub mod validation;

pub use fields::{FieldSelector, Selection, DEFAULT_FILE_FIELDS};
pub use naming::{derive_filename, is_stored_filename, DerivedName, NamingMode};
pub use service::{IngestService, ReceivedFile};
pub use storage::{StagedUpload, StoredArtifact, UploadStorage};
pub use validation::{UploadPolicy, DEFAULT_ALLOWED_TYPES, DEFAULT_MAX_UPLOAD_SIZE};
