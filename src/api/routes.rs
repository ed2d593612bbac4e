use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize;

    let mut router = Router::new()
        // Recipes
        .route("/recipes", get(handlers::list_recipes))
        .route(
            "/recipes",
            post(handlers::create_recipe).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/recipes/:id", get(handlers::get_recipe))
        .route("/recipes/:id", delete(handlers::delete_recipe))
        // Image content (local backend resolution path)
        .route("/images/*key", get(handlers::serve_image))
        // Internal
        .route("/_internal/health", get(handlers::health));

    // Test-only routes
    if state.config.test_mode {
        tracing::warn!("Test mode enabled — purge route is available.");
        router = router.route("/admin/purge", delete(handlers::admin_purge));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
