use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::{ObjectStore, ObjectStoreError};

/// Local filesystem object store for development and testing.
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Resolve a key under the store base, rejecting anything that could
    /// escape it. Keys arrive from URLs, not only from trusted callers.
    fn object_path(&self, key: &str) -> Result<PathBuf, ObjectStoreError> {
        let traversal = key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
        if traversal || key.contains('\\') {
            return Err(ObjectStoreError::Backend(format!(
                "Invalid object key: {key}"
            )));
        }
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let path = self.object_path(key)?;
        // Keys contain slashes, so the parent directories may not exist yet
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        let path = self.object_path(key)?;
        if !path.exists() {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        let data = tokio::fs::read(&path).await?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        let path = self.object_path(key)?;
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        let path = self.object_path(key)?;
        Ok(path.exists())
    }

    async fn access_url(
        &self,
        key: &str,
        _expires_in: Duration,
    ) -> Result<String, ObjectStoreError> {
        // Served by the application's own /images route; access control is
        // the application's, so there is nothing to sign locally.
        Ok(format!("/images/{key}"))
    }
}
