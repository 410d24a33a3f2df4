//! Filesystem storage for uploads.
//!
//! Bytes are streamed into a hidden temporary file inside the storage
//! directory and renamed onto their final name only once the whole payload
//! has been accepted. A failed, rejected or abandoned upload never becomes
//! visible under a final name: dropping a [`StagedUpload`] deletes its
//! temporary file, which also covers request futures dropped on client
//! disconnect.
//!
//! Commits are last-write-wins. Two uploads committing the same name leave
//! whichever rename happened last.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{pin_mut, Stream, StreamExt};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::validation::UploadPolicy;
use crate::error::UploadError;

/// Prefix of in-flight temporary files.
pub const STAGING_PREFIX: &str = ".staging-";

/// Flat directory of stored uploads.
#[derive(Debug, Clone)]
pub struct UploadStorage {
    root: PathBuf,
}

/// An accepted payload waiting for its final name.
#[derive(Debug)]
pub struct StagedUpload {
    path: TempPath,
    size: u64,
}

impl StagedUpload {
    /// Bytes written.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Location of the temporary file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A committed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    /// Name of the file inside the storage directory
    pub filename: String,
    /// Full path on disk
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
}

impl UploadStorage {
    /// Open storage rooted at `root`, creating the directory if needed.
    ///
    /// Call once during startup.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        info!(root = %root.display(), "Upload storage ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a stored filename resolves to.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Stream `body` into a temporary file, enforcing the policy's size limit.
    ///
    /// Reading stops at the first chunk that pushes the total over the limit.
    pub async fn stage<S>(
        &self,
        field: &str,
        body: S,
        policy: &UploadPolicy,
    ) -> Result<StagedUpload, UploadError>
    where
        S: Stream<Item = Result<Bytes, UploadError>>,
    {
        let storage = self.clone();
        let (file, path) = tokio::task::spawn_blocking(move || storage.create_temp())
            .await
            .map_err(blocking_task_failed)??
            .into_parts();
        let mut file = tokio::fs::File::from_std(file);
        let mut size: u64 = 0;

        pin_mut!(body);
        while let Some(chunk) = body.next().await {
            // Returning early drops `path`, which removes the temporary file.
            let chunk = chunk?;
            size = size.saturating_add(chunk.len() as u64);
            policy.check_size(field, size)?;
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        drop(file);

        debug!(
            field = field,
            bytes = size,
            temp = %path.display(),
            "Staged upload"
        );

        Ok(StagedUpload { path, size })
    }

    /// Rename a staged upload onto `filename`, replacing any existing file.
    pub async fn commit(
        &self,
        staged: StagedUpload,
        filename: &str,
    ) -> Result<StoredArtifact, UploadError> {
        let destination = self.path_for(filename);
        let size = staged.size;
        let target = destination.clone();
        tokio::task::spawn_blocking(move || staged.path.persist(&target))
            .await
            .map_err(blocking_task_failed)??;

        Ok(StoredArtifact {
            filename: filename.to_string(),
            path: destination,
            size,
        })
    }

    /// Create a temporary file, recreating the directory if it vanished.
    fn create_temp(&self) -> io::Result<tempfile::NamedTempFile> {
        let builder = || {
            tempfile::Builder::new()
                .prefix(STAGING_PREFIX)
                .tempfile_in(&self.root)
        };

        match builder() {
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                std::fs::create_dir_all(&self.root)?;
                builder()
            }
            other => other,
        }
    }
}

fn blocking_task_failed(err: tokio::task::JoinError) -> UploadError {
    UploadError::Internal(format!("storage task failed: {}", err))
}

// =============================================================================
// Tests
// =============================================================================
