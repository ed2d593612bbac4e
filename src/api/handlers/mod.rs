mod admin;
mod images;
mod recipes;

use crate::api::response::ApiError;
use crate::recipes::RecipeError;

pub use admin::{admin_purge, health};
pub use images::serve_image;
pub use recipes::{create_recipe, delete_recipe, get_recipe, list_recipes};

/// Map a RecipeError to an ApiError
fn recipe_error(e: RecipeError) -> ApiError {
    match e {
        RecipeError::NotFound(_) => ApiError::not_found("Recipe not found"),
        RecipeError::Storage(e) => ApiError::internal(format!("Image storage failed: {e}")),
        RecipeError::Persistence(e) => ApiError::internal(format!("Metadata storage failed: {e}")),
    }
}
