//! # Object Storage Collaborator
//!
//! The bucket is reached only through [`ObjectStore`]. Production uses the
//! GCS client in `morse-gcs`; tests and local development use
//! [`crate::memory::MemoryObjectStore`].

use async_trait::async_trait;
use thiserror::Error;

/// Image extensions recognised by the catalog and the artifact resolver.
///
/// Order matters for the resolver: the first suffix that matches wins.
pub const IMAGE_EXTENSIONS: [&str; 5] = [".png", ".jpg", ".jpeg", ".gif", ".bmp"];

/// Errors surfaced by an object storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// No object exists at the requested path.
    #[error("file {0} not found")]
    NotFound(String),

    /// The backend failed (transport, auth, unexpected status).
    #[error("storage backend failure: {0}")]
    Upstream(String),

    /// The object exists but its content could not be decoded as requested.
    #[error("could not decode {path}: {reason}")]
    Decode { path: String, reason: String },
}

/// Operations the service needs from object storage.
///
/// Paths are bucket-relative object names (`images/project1/a.jpg`).
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Whether an object exists at exactly `path`.
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Return the name of some object whose name starts with `prefix`.
    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<String>, StorageError>;

    /// Download an object's bytes. Missing objects yield [`StorageError::NotFound`].
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Download an object and decode it as UTF-8.
    async fn get_text(&self, path: &str) -> Result<String, StorageError> {
        let bytes = self.get(path).await?;
        String::from_utf8(bytes).map_err(|e| StorageError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Upload `bytes` to exactly `path`, overwriting any existing object.
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    /// List object names starting with `prefix`, in the backend's order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Whether `path` ends with a recognised image extension, ignoring case.
pub fn is_image_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
