//! Where column metadata comes from: the live database or an in-memory table list.

use crate::error::AppError;
use crate::schema::types::{ColumnDescriptor, SemanticType};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;

#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Columns of `schema.table` in ordinal order. Empty when the table does not exist.
    async fn load_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnDescriptor>, AppError>;
}

/// Reads `information_schema.columns`.
pub struct PgSchemaSource {
    pool: PgPool,
}

impl PgSchemaSource {
    pub fn new(pool: PgPool) -> Self {
        PgSchemaSource { pool }
    }
}

const COLUMNS_SQL: &str = "SELECT column_name::text, data_type::text, udt_schema::text, udt_name::text, \
     (is_nullable = 'YES') AS nullable \
     FROM information_schema.columns \
     WHERE table_schema = $1 AND table_name = $2 \
     ORDER BY ordinal_position";

#[async_trait]
impl SchemaSource for PgSchemaSource {
    async fn load_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnDescriptor>, AppError> {
        tracing::debug!(sql = %COLUMNS_SQL, schema = %schema, table = %table, "query");
        let rows = sqlx::query_as::<_, (String, String, String, String, bool)>(COLUMNS_SQL)
            .bind(schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(name, data_type, udt_schema, udt_name, nullable)| ColumnDescriptor {
                semantic_type: SemanticType::from_pg_data_type(&data_type),
                pg_type: cast_type_name(&data_type, &udt_schema, &udt_name),
                name,
                nullable,
            })
            .collect())
    }
}

/// Type name for `$n::type` casts. User-defined types (enums, domains) need the schema-qualified, quoted form.
fn cast_type_name(data_type: &str, udt_schema: &str, udt_name: &str) -> String {
    if data_type == "USER-DEFINED" {
        format!(
            "\"{}\".\"{}\"",
            udt_schema.replace('"', "\"\""),
            udt_name.replace('"', "\"\"")
        )
    } else {
        udt_name.to_string()
    }
}

/// Fixed table definitions, keyed by `schema.table`.
#[derive(Clone, Debug, Default)]
pub struct StaticSchemaSource {
    tables: HashMap<String, Vec<ColumnDescriptor>>,
}

impl StaticSchemaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, schema: &str, table: &str, columns: Vec<ColumnDescriptor>) -> Self {
        self.tables.insert(format!("{}.{}", schema, table), columns);
        self
    }
}

#[async_trait]
impl SchemaSource for StaticSchemaSource {
    async fn load_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnDescriptor>, AppError> {
        Ok(self
            .tables
            .get(&format!("{}.{}", schema, table))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_defined_types_are_qualified() {
        assert_eq!(cast_type_name("USER-DEFINED", "public", "mood"), "\"public\".\"mood\"");
        assert_eq!(cast_type_name("integer", "pg_catalog", "int4"), "int4");
    }

    #[tokio::test]
    async fn static_source_returns_registered_tables_only() {
        let source = StaticSchemaSource::new().with_table(
            "public",
            "tags",
            vec![ColumnDescriptor::new("label", SemanticType::Text, "text")],
        );
        assert_eq!(source.load_columns("public", "tags").await.unwrap().len(), 1);
        assert!(source.load_columns("public", "other").await.unwrap().is_empty());
    }
}
