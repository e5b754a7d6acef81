use std::sync::Arc;

use crate::db::{CatalogStore, MemoryStore};
use crate::services::CatalogService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Creates state over an empty in-memory catalog
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Creates state over the given record store
    pub fn with_store(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            catalog: CatalogService::new(store),
        }
    }
}
