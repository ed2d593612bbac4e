use chrono::{Duration, Utc};
use recipe_manager::storage::models::{parse_ingredients, RecipeRecord};
use recipe_manager::storage::Database;

fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data"), "recipes").unwrap();
    (dir, db)
}

fn sample_recipe(id: &str, title: &str) -> RecipeRecord {
    RecipeRecord {
        id: id.to_string(),
        title: title.to_string(),
        description: "A test recipe".to_string(),
        ingredients: vec!["flour".to_string(), "sugar".to_string()],
        instructions: "Mix and bake.".to_string(),
        image_key: None,
        image_content_type: None,
        created_at: Utc::now(),
    }
}

#[test]
fn test_put_and_get_recipe() {
    let (_dir, db) = test_db();
    let recipe = sample_recipe("recipe-1", "Chocolate Cake");

    db.put_recipe(&recipe).unwrap();

    let retrieved = db
        .get_recipe("recipe-1")
        .unwrap()
        .expect("recipe should exist");
    assert_eq!(retrieved.id, "recipe-1");
    assert_eq!(retrieved.title, "Chocolate Cake");
    assert_eq!(retrieved.description, "A test recipe");
    assert_eq!(retrieved.ingredients, vec!["flour", "sugar"]);
    assert_eq!(retrieved.instructions, "Mix and bake.");
    assert_eq!(retrieved.image_key, None);
    assert_eq!(retrieved.image_content_type, None);
}

#[test]
fn test_put_recipe_with_image_key() {
    let (_dir, db) = test_db();
    let mut recipe = sample_recipe("recipe-2", "Soup");
    recipe.image_key = Some("recipes/recipe-2/soup.jpg".to_string());
    recipe.image_content_type = Some("image/jpeg".to_string());

    db.put_recipe(&recipe).unwrap();

    let retrieved = db.get_recipe("recipe-2").unwrap().unwrap();
    assert_eq!(
        retrieved.image_key,
        Some("recipes/recipe-2/soup.jpg".to_string())
    );
    assert_eq!(retrieved.image_content_type, Some("image/jpeg".to_string()));
}

#[test]
fn test_get_recipe_not_found() {
    let (_dir, db) = test_db();
    assert!(db.get_recipe("nonexistent").unwrap().is_none());
}

#[test]
fn test_delete_recipe() {
    let (_dir, db) = test_db();
    db.put_recipe(&sample_recipe("recipe-3", "To Delete")).unwrap();

    assert!(db.delete_recipe("recipe-3").unwrap());
    assert!(db.get_recipe("recipe-3").unwrap().is_none());
}

#[test]
fn test_delete_recipe_not_found() {
    let (_dir, db) = test_db();
    assert!(!db.delete_recipe("nonexistent").unwrap());
}

#[test]
fn test_delete_recipe_twice() {
    let (_dir, db) = test_db();
    db.put_recipe(&sample_recipe("recipe-4", "Once")).unwrap();

    assert!(db.delete_recipe("recipe-4").unwrap());
    // Second delete is a no-op signal, not an error
    assert!(!db.delete_recipe("recipe-4").unwrap());
}

#[test]
fn test_list_recipes_empty() {
    let (_dir, db) = test_db();
    assert!(db.list_recipes().unwrap().is_empty());
}

#[test]
fn test_list_recipes_newest_first() {
    let (_dir, db) = test_db();
    let now = Utc::now();

    let mut oldest = sample_recipe("old", "Oldest");
    oldest.created_at = now - Duration::hours(2);
    let mut middle = sample_recipe("mid", "Middle");
    middle.created_at = now - Duration::hours(1);
    let mut newest = sample_recipe("new", "Newest");
    newest.created_at = now;

    // Insert out of order
    db.put_recipe(&middle).unwrap();
    db.put_recipe(&newest).unwrap();
    db.put_recipe(&oldest).unwrap();

    let recipes = db.list_recipes().unwrap();
    let ids: Vec<&str> = recipes.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "mid", "old"]);
}

#[test]
fn test_custom_collection_name() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data"), "my_recipes").unwrap();

    db.put_recipe(&sample_recipe("c-1", "Collected")).unwrap();
    assert!(db.get_recipe("c-1").unwrap().is_some());
}

#[test]
fn test_purge_all() {
    let (_dir, db) = test_db();
    db.put_recipe(&sample_recipe("p1", "Purge One")).unwrap();
    db.put_recipe(&sample_recipe("p2", "Purge Two")).unwrap();

    let stats = db.purge_all().unwrap();
    assert_eq!(stats.recipes, 2);
    assert!(db.list_recipes().unwrap().is_empty());
}

#[test]
fn test_parse_ingredients() {
    let parsed = parse_ingredients("tomatoes\n  cucumber  \n\n\nolive oil\n");
    assert_eq!(parsed, vec!["tomatoes", "cucumber", "olive oil"]);

    assert!(parse_ingredients("").is_empty());
    assert!(parse_ingredients("\n \n").is_empty());
}
