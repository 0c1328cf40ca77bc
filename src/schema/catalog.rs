//! Process-wide cache of entity descriptors. Populate once, read many.

use crate::error::{AppError, ConfigError};
use crate::schema::source::SchemaSource;
use crate::schema::types::{EntityDescriptor, SemanticType};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub struct SchemaCatalog {
    source: Arc<dyn SchemaSource>,
    cache: RwLock<HashMap<String, Arc<EntityDescriptor>>>,
}

impl SchemaCatalog {
    pub fn new(source: Arc<dyn SchemaSource>) -> Self {
        SchemaCatalog {
            source,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Descriptor for `schema.table`, loaded from the source on first use.
    /// Concurrent first calls may both load; they compute the same value and the last insert wins.
    pub async fn describe(&self, schema: &str, table: &str) -> Result<Arc<EntityDescriptor>, AppError> {
        let key = format!("{}.{}", schema, table);
        if let Some(found) = self.cached(&key) {
            return Ok(found);
        }
        let columns = self.source.load_columns(schema, table).await?;
        if columns.is_empty() {
            return Err(ConfigError::MissingReference { kind: "table", id: key }.into());
        }
        let descriptor = Arc::new(EntityDescriptor::new(schema, table, columns));
        tracing::debug!(table = %key, columns = descriptor.columns().len(), "schema cached");
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, descriptor.clone());
        }
        Ok(descriptor)
    }

    pub async fn column_names(&self, schema: &str, table: &str) -> Result<Vec<String>, AppError> {
        let d = self.describe(schema, table).await?;
        Ok(d.columns().iter().map(|c| c.name.clone()).collect())
    }

    pub async fn column_type(&self, schema: &str, table: &str, column: &str) -> Result<Option<SemanticType>, AppError> {
        Ok(self.describe(schema, table).await?.column_type(column))
    }

    pub async fn has_column(&self, schema: &str, table: &str, column: &str) -> Result<bool, AppError> {
        Ok(self.describe(schema, table).await?.has_column(column))
    }

    fn cached(&self, key: &str) -> Option<Arc<EntityDescriptor>> {
        self.cache.read().ok().and_then(|c| c.get(key).cloned())
    }
}
