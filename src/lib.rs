//! recipe-manager - A small internal API for recipe storage and image
//! lifecycle management
//!
//! This crate provides recipe upload, listing, and deletion with:
//! - Recipe metadata in a redb document collection (ACID, MVCC, crash-safe)
//! - Swappable object storage backends for photos (local filesystem, GCS)
//! - A lifecycle coordinator that keeps metadata records and image blobs
//!   consistent across create and delete
//! - REST API with multipart upload support

pub mod api;
pub mod config;
pub mod object_store;
pub mod recipes;
pub mod storage;

use std::sync::Arc;

use config::Config;
use recipes::RecipeService;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub object_store: Arc<dyn object_store::ObjectStore>,
    pub recipes: RecipeService,
}
