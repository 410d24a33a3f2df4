//! Upload ingestion: field selection, validation, naming and storage.
//!
//! [`IngestService::ingest`] walks the multipart stream once. Each part under
//! an accepted field name is type-checked from its headers, then streamed
//! into staging with the size limit enforced. The best-ranked staged part is
//! named and committed; anything it displaced is discarded.

use axum::extract::multipart::{Field, Multipart};
use futures::StreamExt;
use tracing::{debug, info, warn};

use super::fields::{FieldSelector, Selection};
use super::naming::{derive_filename, NamingMode};
use super::storage::{StagedUpload, StoredArtifact, UploadStorage};
use super::validation::{UploadPolicy, FALLBACK_CONTENT_TYPE};
use crate::error::UploadError;

/// A staged file and the metadata its part declared.
#[derive(Debug)]
pub struct ReceivedFile {
    /// Field name the file arrived under
    pub field: String,
    /// Client-supplied filename
    pub original_name: String,
    /// Declared content type
    pub content_type: String,
    /// Staged bytes
    pub staged: StagedUpload,
}

/// Orchestrates the ingestion pipeline for one storage directory.
#[derive(Debug, Clone)]
pub struct IngestService {
    storage: UploadStorage,
    policy: UploadPolicy,
    fields: FieldSelector,
}

impl IngestService {
    pub fn new(storage: UploadStorage, policy: UploadPolicy, fields: FieldSelector) -> Self {
        Self {
            storage,
            policy,
            fields,
        }
    }

    /// Create a service with the default policy and field names.
    pub fn with_defaults(storage: UploadStorage) -> Self {
        Self::new(storage, UploadPolicy::default(), FieldSelector::default())
    }

    pub fn storage(&self) -> &UploadStorage {
        &self.storage
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn fields(&self) -> &FieldSelector {
        &self.fields
    }

    /// Ingest one multipart submission.
    ///
    /// `hint` is the client-requested name; `None` selects a generated name.
    pub async fn ingest(
        &self,
        multipart: &mut Multipart,
        hint: Option<&str>,
    ) -> Result<StoredArtifact, UploadError> {
        let received = self.receive(multipart).await?;

        let derived = derive_filename(hint, &received.original_name);
        if derived.mode == NamingMode::Fallback {
            warn!(
                hint = hint.unwrap_or_default(),
                filename = %derived.filename,
                "Requested name sanitized to nothing, using a generated name"
            );
        }

        let artifact = self
            .storage
            .commit(received.staged, &derived.filename)
            .await?;

        info!(
            filename = %artifact.filename,
            bytes = artifact.size,
            field = %received.field,
            content_type = %received.content_type,
            original_name = %received.original_name,
            "File uploaded"
        );

        Ok(artifact)
    }

    /// Read the multipart stream and stage the highest-priority file part.
    pub async fn receive(&self, multipart: &mut Multipart) -> Result<ReceivedFile, UploadError> {
        let limit = self.policy.max_bytes();
        let mut selection: Selection<ReceivedFile> = Selection::new();

        loop {
            let field = multipart
                .next_field()
                .await
                .map_err(|err| UploadError::from_multipart(err, None, limit))?;
            let Some(field) = field else {
                break;
            };

            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            let Some(rank) = self.fields.rank(&name) else {
                debug!(field = %name, "Skipping unrelated form field");
                continue;
            };
            let Some(original_name) = field.file_name().map(str::to_owned) else {
                debug!(field = %name, "Skipping text part under a file field name");
                continue;
            };
            if !selection.wants(rank) {
                debug!(field = %name, "Skipping lower-priority file part");
                continue;
            }

            let content_type = field
                .content_type()
                .unwrap_or(FALLBACK_CONTENT_TYPE)
                .to_owned();
            self.policy.check_content_type(&name, &content_type)?;

            let staged = self.stage_field(&name, field).await?;
            let received = ReceivedFile {
                field: name,
                original_name,
                content_type,
                staged,
            };

            if let Some(displaced) = selection.offer(rank, received) {
                debug!(field = %displaced.field, "Discarding displaced file part");
            }
            if selection.is_settled() {
                break;
            }
        }

        selection
            .into_inner()
            .ok_or_else(|| UploadError::MissingFile {
                accepted: self.fields.accepted().to_vec(),
            })
    }

    async fn stage_field(
        &self,
        name: &str,
        field: Field<'_>,
    ) -> Result<StagedUpload, UploadError> {
        let limit = self.policy.max_bytes();
        let body = field.map(|chunk| {
            chunk.map_err(|err| UploadError::from_multipart(err, Some(name), limit))
        });
        self.storage.stage(name, body, &self.policy).await
    }
}

// =============================================================================
// Tests
// =============================================================================
