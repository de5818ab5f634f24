//! Blob storage for avatar uploads
//!
//! The account service only needs "store these bytes, give me a URL".
//! [`LocalBlobStore`] writes into a directory served as static files.

use crate::error::AccountError;

use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

/// Opaque file storage returning a public URL per stored object
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(
        &self,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<String, AccountError>;
}

/// Blob store on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn stored_name(filename: &str) -> String {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("bin")
            .to_ascii_lowercase();
        format!("{}.{}", Uuid::new_v4(), ext)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(
        &self,
        filename: &str,
        _content_type: &str,
        data: Vec<u8>,
    ) -> Result<String, AccountError> {
        let stored_name = Self::stored_name(filename);

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AccountError::Storage(e.to_string()))?;
        tokio::fs::write(self.root.join(&stored_name), data)
            .await
            .map_err(|e| AccountError::Storage(e.to_string()))?;

        tracing::debug!(file = %stored_name, "Stored upload");
        Ok(format!("{}/{}", self.base_url, stored_name))
    }
}
