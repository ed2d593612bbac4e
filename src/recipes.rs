//! Recipe lifecycle coordination.
//!
//! `RecipeService` is the only component that creates or deletes recipe
//! records, and owns the invariant that a record's `image_key` always
//! points at an existing object for as long as the record exists. Create
//! uploads the blob first so metadata never references a missing object;
//! delete looks the record up first, removes the blob, then the record.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

use crate::object_store::{ObjectStore, ObjectStoreError};
use crate::storage::models::{parse_ingredients, RecipeRecord};
use crate::storage::{DatabaseError, RecipeStore};

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("Recipe not found: {0}")]
    NotFound(String),
    #[error("Object storage error: {0}")]
    Storage(#[from] ObjectStoreError),
    #[error("Metadata storage error: {0}")]
    Persistence(#[from] DatabaseError),
}

/// Outcome of a delete. `PartiallyDeleted` means the record is gone but the
/// blob delete failed; callers can inspect it instead of it being swallowed.
#[derive(Debug)]
pub enum DeleteOutcome {
    Deleted,
    PartiallyDeleted { blob_error: ObjectStoreError },
}

/// An image submitted alongside a new recipe.
pub struct ImageUpload {
    pub data: Bytes,
    pub content_type: String,
    pub filename: Option<String>,
}

/// A validated recipe payload. The ingredients arrive as free text and are
/// split into one entry per non-empty line.
pub struct NewRecipe {
    pub title: String,
    pub description: String,
    pub ingredients_text: String,
    pub instructions: String,
    pub image: Option<ImageUpload>,
}

pub struct RecipeService {
    store: Arc<dyn RecipeStore>,
    objects: Arc<dyn ObjectStore>,
    key_prefix: String,
    url_ttl: Duration,
}

impl RecipeService {
    pub fn new(
        store: Arc<dyn RecipeStore>,
        objects: Arc<dyn ObjectStore>,
        key_prefix: impl Into<String>,
        url_ttl: Duration,
    ) -> Self {
        Self {
            store,
            objects,
            key_prefix: key_prefix.into(),
            url_ttl,
        }
    }

    /// Create a recipe, uploading its image first when one is present.
    ///
    /// If the metadata write fails after a successful upload, the uploaded
    /// blob is deleted best-effort before the persistence error surfaces;
    /// a failed rollback is logged and leaves an orphaned blob, never a
    /// record referencing a missing object.
    pub async fn create(&self, new: NewRecipe) -> Result<RecipeRecord, RecipeError> {
        debug_assert!(!new.title.trim().is_empty(), "title validated by caller");

        let id = uuid::Uuid::new_v4().to_string();

        let (image_key, image_content_type) = match new.image {
            Some(image) => {
                let key = image_object_key(&self.key_prefix, &id, image.filename.as_deref());
                self.objects
                    .put(&key, image.data, &image.content_type)
                    .await?;
                (Some(key), Some(image.content_type))
            }
            None => (None, None),
        };

        let record = RecipeRecord {
            id: id.clone(),
            title: new.title,
            description: new.description,
            ingredients: parse_ingredients(&new.ingredients_text),
            instructions: new.instructions,
            image_key,
            image_content_type,
            created_at: chrono::Utc::now(),
        };

        if let Err(e) = self.store.put_recipe(&record) {
            // Compensate: the blob exists but nothing references it yet
            if let Some(ref key) = record.image_key {
                if let Err(rollback) = self.objects.delete(key).await {
                    tracing::warn!(
                        recipe_id = %id,
                        image_key = %key,
                        error = %rollback,
                        "Failed to roll back uploaded image after metadata write failure"
                    );
                }
            }
            return Err(e.into());
        }

        tracing::debug!(recipe_id = %id, has_image = record.image_key.is_some(), "Created recipe");
        Ok(record)
    }

    pub fn get(&self, id: &str) -> Result<RecipeRecord, RecipeError> {
        self.store
            .get_recipe(id)?
            .ok_or_else(|| RecipeError::NotFound(id.to_string()))
    }

    /// All recipes, newest first.
    pub fn list(&self) -> Result<Vec<RecipeRecord>, RecipeError> {
        Ok(self.store.list_recipes()?)
    }

    /// Delete a recipe and its image.
    ///
    /// A failing blob delete does not stop the metadata delete: a stale
    /// visible record a user can re-delete is worse than an orphaned blob.
    /// The partial outcome is reported, not hidden.
    pub async fn delete(&self, id: &str) -> Result<DeleteOutcome, RecipeError> {
        let record = self.get(id)?;

        let mut blob_error = None;
        if let Some(ref key) = record.image_key {
            if let Err(e) = self.objects.delete(key).await {
                tracing::warn!(recipe_id = %id, image_key = %key, error = %e,
                    "Failed to delete recipe image; removing the record anyway");
                blob_error = Some(e);
            }
        }

        if !self.store.delete_recipe(id)? {
            // Lost a race with a concurrent delete; the other caller wins
            return Err(RecipeError::NotFound(id.to_string()));
        }

        tracing::debug!(recipe_id = %id, "Deleted recipe");
        match blob_error {
            None => Ok(DeleteOutcome::Deleted),
            Some(blob_error) => Ok(DeleteOutcome::PartiallyDeleted { blob_error }),
        }
    }

    /// Resolve a record's image to a time-limited URL. Resolved per render
    /// so stored records never hold an expiring URL.
    pub async fn image_url(&self, record: &RecipeRecord) -> Result<Option<String>, RecipeError> {
        match record.image_key {
            Some(ref key) => Ok(Some(self.objects.access_url(key, self.url_ttl).await?)),
            None => Ok(None),
        }
    }

    /// Fetch the raw image bytes for a record.
    pub async fn fetch_image(&self, record: &RecipeRecord) -> Result<Bytes, RecipeError> {
        let key = record
            .image_key
            .as_deref()
            .ok_or_else(|| RecipeError::NotFound(format!("{} has no image", record.id)))?;
        Ok(self.objects.get(key).await?)
    }
}

/// Deterministic blob key for a recipe's image:
/// `{prefix}/{recipe_id}/{sanitized_filename}`.
pub fn image_object_key(prefix: &str, recipe_id: &str, filename: Option<&str>) -> String {
    let name = filename
        .map(sanitize_filename)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "image".to_string());
    format!("{prefix}/{recipe_id}/{name}")
}

/// Reduce an untrusted upload filename to a safe key segment.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_object_key() {
        assert_eq!(
            image_object_key("recipes", "abc", Some("soup photo.jpg")),
            "recipes/abc/soup_photo.jpg"
        );
        assert_eq!(image_object_key("recipes", "abc", None), "recipes/abc/image");
        assert_eq!(
            image_object_key("recipes", "abc", Some("../../etc/passwd")),
            "recipes/abc/_.._etc_passwd"
        );
    }

    #[test]
    fn test_sanitize_filename_strips_dots() {
        assert_eq!(sanitize_filename("..hidden.."), "hidden");
        assert_eq!(sanitize_filename("Cake (1).PNG"), "Cake__1_.PNG");
    }
}
