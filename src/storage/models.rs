use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recipe record stored in the metadata collection.
///
/// `image_key` and `image_content_type` are set together: both `Some` when
/// an image was uploaded with the recipe, both `None` otherwise. The key
/// points at the object in the blob store; the URL shown to clients is
/// resolved from it at render time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: String,
    #[serde(default)]
    pub image_key: Option<String>,
    #[serde(default)]
    pub image_content_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Split an ingredients text area into one entry per non-empty line.
pub fn parse_ingredients(ingredients_text: &str) -> Vec<String> {
    ingredients_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
