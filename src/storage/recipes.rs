use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::RecipeRecord;
use super::RecipeStore;

impl Database {
    // ========================================================================
    // Recipe operations
    // ========================================================================

    /// Store a recipe record keyed by its id
    pub fn put_recipe(&self, recipe: &RecipeRecord) -> Result<(), DatabaseError> {
        debug_assert!(!recipe.id.is_empty(), "recipe id must not be empty");
        debug_assert!(
            !recipe.title.trim().is_empty(),
            "recipe title must not be empty"
        );

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(self.recipes_table())?;
            let data = rmp_serde::to_vec_named(recipe)?;
            table.insert(recipe.id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a recipe by its id
    pub fn get_recipe(&self, id: &str) -> Result<Option<RecipeRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(self.recipes_table())?;

        match table.get(id)? {
            Some(data) => {
                let recipe: RecipeRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(recipe))
            }
            None => Ok(None),
        }
    }

    /// Delete a recipe by its id. Returns `false` when the id is absent,
    /// so a raced second delete is a no-op signal rather than an error.
    pub fn delete_recipe(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(self.recipes_table())?;
            // Drop the access guard before the table goes out of scope
            let removed = table.remove(id)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    /// All recipes, newest first. An empty collection yields an empty vec.
    pub fn list_recipes(&self) -> Result<Vec<RecipeRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(self.recipes_table())?;

        let mut recipes = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let recipe: RecipeRecord = rmp_serde::from_slice(value.value())?;
            recipes.push(recipe);
        }

        recipes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(recipes)
    }
}

impl RecipeStore for Database {
    fn put_recipe(&self, recipe: &RecipeRecord) -> Result<(), DatabaseError> {
        Database::put_recipe(self, recipe)
    }

    fn get_recipe(&self, id: &str) -> Result<Option<RecipeRecord>, DatabaseError> {
        Database::get_recipe(self, id)
    }

    fn delete_recipe(&self, id: &str) -> Result<bool, DatabaseError> {
        Database::delete_recipe(self, id)
    }

    fn list_recipes(&self) -> Result<Vec<RecipeRecord>, DatabaseError> {
        Database::list_recipes(self)
    }
}
