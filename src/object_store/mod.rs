mod gcs;
mod local;

pub use gcs::GcsStore;
pub use local::LocalStore;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Abstraction over object storage backends.
///
/// Keys are namespaced paths (`{prefix}/{recipe_id}/{filename}`) -- the raw
/// blobs are meaningless without the metadata collection. Objects are never
/// made publicly readable; `access_url` produces either a time-limited
/// signed URL or a path served behind the application's own access checks.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Bytes, content_type: &str)
        -> Result<(), ObjectStoreError>;
    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError>;
    /// Deleting an absent key succeeds: it is the terminal state of a
    /// concurrent or retried delete.
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError>;
    /// A URL the display layer can resolve for at most `expires_in`.
    async fn access_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, ObjectStoreError>;
}
