pub mod db;
pub mod models;
mod recipes;

pub use db::{Database, DatabaseError};

use self::models::RecipeRecord;

/// Metadata store behaviour required by the recipe lifecycle layer.
/// `Database` is the redb-backed implementation; tests substitute fakes.
pub trait RecipeStore: Send + Sync {
    fn put_recipe(&self, recipe: &RecipeRecord) -> Result<(), DatabaseError>;
    fn get_recipe(&self, id: &str) -> Result<Option<RecipeRecord>, DatabaseError>;
    /// Returns `false` when the id is absent (idempotent delete).
    fn delete_recipe(&self, id: &str) -> Result<bool, DatabaseError>;
    /// All recipes ordered by `created_at` descending.
    fn list_recipes(&self) -> Result<Vec<RecipeRecord>, DatabaseError>;
}
