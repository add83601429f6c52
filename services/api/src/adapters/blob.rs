//! services/api/src/adapters/blob.rs
//!
//! Local-disk implementation of the `BlobStorage` port. Uploaded content is written
//! under a single directory that is created on first use.

use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use testgen_core::ports::{BlobStorage, PortError, PortResult};
use tokio::fs;
use uuid::Uuid;

/// Every generated blob name starts with the multipart field it arrived in.
const FIELD_LABEL: &str = "files";

#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Builds `files-<unix millis>-<random><.ext>` from the original file name.
    fn generate_key(original_name: &str) -> String {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_lowercase()))
            .unwrap_or_default();
        format!(
            "{}-{}-{}{}",
            FIELD_LABEL,
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            extension
        )
    }

    /// Resolves a key inside the root, refusing anything that could escape it.
    fn path_for(&self, key: &str) -> PortResult<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.contains("..") {
            return Err(PortError::Unexpected(format!("Invalid blob key '{}'", key)));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStore {
    async fn save(&self, original_name: &str, data: &[u8]) -> PortResult<String> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            PortError::Unexpected(format!(
                "Failed to create upload directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let key = Self::generate_key(original_name);
        let path = self.path_for(&key)?;
        fs::write(&path, data)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to write blob {}: {}", key, e)))?;
        Ok(key)
    }

    async fn read(&self, key: &str) -> PortResult<Vec<u8>> {
        let path = self.path_for(key)?;
        fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => PortError::NotFound(format!("Blob {} not found", key)),
            _ => PortError::Unexpected(format!("Failed to read blob {}: {}", key, e)),
        })
    }

    async fn delete(&self, key: &str) -> PortResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Unexpected(format!(
                "Failed to delete blob {}: {}",
                key, e
            ))),
        }
    }
}
