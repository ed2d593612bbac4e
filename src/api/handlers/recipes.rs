use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::Json;
use bytes::BytesMut;
use serde::Serialize;

use super::recipe_error;
use crate::api::response::{ApiError, JSend};
use crate::recipes::{DeleteOutcome, ImageUpload, NewRecipe};
use crate::storage::models::RecipeRecord;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub created_at: String,
    pub description: String,
    pub id: String,
    pub image_url: Option<String>,
    pub ingredients: Vec<String>,
    pub instructions: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteRecipeResponse {
    pub id: String,
    /// True when the record was removed but its image could not be deleted.
    pub partial: bool,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_recipe(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<JSend<RecipeResponse>>, ApiError> {
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut ingredients: Option<String> = None;
    let mut instructions: Option<String> = None;
    let mut image_data: Option<BytesMut> = None;
    let mut image_name: Option<String> = None;
    let mut image_content_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "image" => {
                image_name = field.file_name().map(|s| s.to_string());
                image_content_type = field.content_type().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read image: {e}")))?;

                if data.len() as u64 > state.config.max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "Image exceeds maximum upload size of {} bytes",
                        state.config.max_upload_size
                    )));
                }

                let mut buf = BytesMut::with_capacity(data.len());
                buf.extend_from_slice(&data);
                image_data = Some(buf);
            }
            "title" => {
                title = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid title: {e}")))?,
                );
            }
            "description" => {
                description = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid description: {e}")))?,
                );
            }
            "ingredients" => {
                ingredients = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid ingredients: {e}")))?,
                );
            }
            "instructions" => {
                instructions = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid instructions: {e}")))?,
                );
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let title = title.map(|t| t.trim().to_string()).unwrap_or_default();
    if title.is_empty() {
        return Err(ApiError::bad_request("Please provide a recipe title."));
    }

    let image = match image_data {
        Some(data) if !data.is_empty() => {
            if !image_name.as_deref().map(allowed_image).unwrap_or(false) {
                return Err(ApiError::bad_request(
                    "Unsupported image format. Allowed formats: png, jpg, jpeg, gif, webp.",
                ));
            }

            // Prefer the multipart Content-Type, then guess from the filename
            let content_type = image_content_type
                .filter(|ct| ct != "application/octet-stream")
                .or_else(|| {
                    image_name
                        .as_deref()
                        .and_then(|n| mime_guess::from_path(n).first())
                        .map(|m| m.to_string())
                })
                .unwrap_or_else(|| "application/octet-stream".to_string());

            Some(ImageUpload {
                data: data.freeze(),
                content_type,
                filename: image_name,
            })
        }
        _ => None,
    };

    let record = state
        .recipes
        .create(NewRecipe {
            title,
            description: description.unwrap_or_default(),
            ingredients_text: ingredients.unwrap_or_default(),
            instructions: instructions.unwrap_or_default(),
            image,
        })
        .await
        .map_err(recipe_error)?;

    let response = recipe_to_response(&state, &record).await?;
    Ok(JSend::success(response))
}

pub async fn get_recipe(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<RecipeResponse>>, ApiError> {
    let record = state.recipes.get(&id).map_err(recipe_error)?;
    let response = recipe_to_response(&state, &record).await?;
    Ok(JSend::success(response))
}

pub async fn list_recipes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<Vec<RecipeResponse>>>, ApiError> {
    let records = state.recipes.list().map_err(recipe_error)?;

    let mut items = Vec::with_capacity(records.len());
    for record in &records {
        items.push(recipe_to_response(&state, record).await?);
    }

    Ok(JSend::success(items))
}

pub async fn delete_recipe(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<DeleteRecipeResponse>>, ApiError> {
    let outcome = state.recipes.delete(&id).await.map_err(recipe_error)?;

    let partial = matches!(outcome, DeleteOutcome::PartiallyDeleted { .. });
    Ok(JSend::success(DeleteRecipeResponse { id, partial }))
}

// ============================================================================
// Helpers
// ============================================================================

const ALLOWED_IMAGE_EXTENSIONS: [&str; 5] = ["gif", "jpeg", "jpg", "png", "webp"];

/// Accept only image uploads whose filename carries a known extension.
fn allowed_image(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

async fn recipe_to_response(
    state: &AppState,
    record: &RecipeRecord,
) -> Result<RecipeResponse, ApiError> {
    let image_url = state
        .recipes
        .image_url(record)
        .await
        .map_err(recipe_error)?;

    Ok(RecipeResponse {
        created_at: record.created_at.to_rfc3339(),
        description: record.description.clone(),
        id: record.id.clone(),
        image_url,
        ingredients: record.ingredients.clone(),
        instructions: record.instructions.clone(),
        title: record.title.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::allowed_image;

    #[test]
    fn test_allowed_image_extensions() {
        assert!(allowed_image("cake.png"));
        assert!(allowed_image("photo.JPG"));
        assert!(allowed_image("holiday.jpeg"));
        assert!(allowed_image("anim.gif"));
        assert!(allowed_image("modern.webp"));
    }

    #[test]
    fn test_rejected_image_extensions() {
        assert!(!allowed_image("document.pdf"));
        assert!(!allowed_image("script.sh"));
        assert!(!allowed_image("noextension"));
        assert!(!allowed_image("archive.tar.gz"));
        assert!(!allowed_image(""));
    }
}
