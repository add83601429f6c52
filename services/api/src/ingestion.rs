//! services/api/src/ingestion.rs
//!
//! File ingestion: validates each uploaded document, writes its blob and records the
//! metadata. Files in a batch are committed independently of each other, so one
//! rejected file does not undo the others.

use std::sync::Arc;
use testgen_core::domain::{validate_upload, File, FileRejection, NewFile};
use testgen_core::ports::{BlobStorage, DatabaseService, PortError};
use tracing::{info, warn};

/// One file part taken from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The file itself was not acceptable; nothing was stored.
    #[error("{0}")]
    Rejected(#[from] FileRejection),
    /// Storage failed; any blob that was written has been removed.
    #[error(transparent)]
    Storage(#[from] PortError),
}

/// Strips MIME parameters and lowercases, e.g. "Text/Plain; charset=utf-8" -> "text/plain".
pub fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_lowercase()
}

#[derive(Clone)]
pub struct FileIngestor {
    db: Arc<dyn DatabaseService>,
    blobs: Arc<dyn BlobStorage>,
}

impl FileIngestor {
    pub fn new(db: Arc<dyn DatabaseService>, blobs: Arc<dyn BlobStorage>) -> Self {
        Self { db, blobs }
    }

    /// Validates and stores a single file.
    pub async fn ingest(&self, upload: UploadedFile) -> Result<File, IngestError> {
        let mime_type = upload
            .mime_type
            .as_deref()
            .map(normalize_mime_type)
            .unwrap_or_default();
        let size = i64::try_from(upload.data.len()).unwrap_or(i64::MAX);
        validate_upload(&upload.name, size, &mime_type)?;

        let storage_key = self.blobs.save(&upload.name, &upload.data).await?;

        let new_file = NewFile {
            name: upload.name,
            size,
            mime_type,
            storage_key: storage_key.clone(),
        };
        match self.db.create_file(new_file).await {
            Ok(file) => {
                info!(file_id = file.id, name = %file.name, size = file.size, "Stored uploaded file");
                Ok(file)
            }
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&storage_key).await {
                    warn!("Failed to remove blob {} after a store error: {}", storage_key, cleanup);
                }
                Err(e.into())
            }
        }
    }

    /// Deletes a file record and then its blob. Unknown ids are ignored.
    pub async fn remove(&self, id: i32) -> Result<Option<File>, PortError> {
        let removed = self.db.delete_file(id).await?;
        if let Some(file) = &removed {
            if let Err(e) = self.blobs.delete(&file.storage_key).await {
                warn!(file_id = id, "Failed to remove blob {}: {}", file.storage_key, e);
            }
        }
        Ok(removed)
    }
}
