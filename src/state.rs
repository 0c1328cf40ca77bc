//! Shared application state for all routes. Registry and catalog are read-only after startup.

use crate::config::EntityRegistry;
use crate::schema::SchemaCatalog;
use crate::service::QueryExecutor;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub registry: Arc<EntityRegistry>,
    pub catalog: Arc<SchemaCatalog>,
    /// Upper bound for `limit` and `take`.
    pub max_page_size: u64,
}

impl AppState {
    pub fn new(pool: PgPool, registry: EntityRegistry, catalog: SchemaCatalog, max_page_size: u64) -> Self {
        AppState {
            pool,
            registry: Arc::new(registry),
            catalog: Arc::new(catalog),
            max_page_size,
        }
    }

    pub fn executor(&self) -> QueryExecutor {
        QueryExecutor::new(self.pool.clone(), self.catalog.clone(), self.max_page_size)
    }
}
