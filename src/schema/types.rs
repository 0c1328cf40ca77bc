//! Column and entity descriptors reported by the schema collaborator.

use std::collections::HashMap;

/// Logical type of a column, independent of its storage representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SemanticType {
    Boolean,
    Integer,
    Float,
    Date,
    DateTime,
    String,
    Text,
    /// uuid, json, arrays, enums, ... Never filterable.
    Other,
}

impl SemanticType {
    /// Map an `information_schema.columns.data_type` value.
    pub fn from_pg_data_type(data_type: &str) -> Self {
        let lower = data_type.to_lowercase();
        match lower.as_str() {
            "boolean" => SemanticType::Boolean,
            "smallint" | "integer" | "bigint" => SemanticType::Integer,
            "real" | "double precision" | "numeric" => SemanticType::Float,
            "date" => SemanticType::Date,
            "character varying" | "character" => SemanticType::String,
            "text" => SemanticType::Text,
            t if t.starts_with("timestamp") => SemanticType::DateTime,
            _ => SemanticType::Other,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ColumnDescriptor {
    pub name: String,
    pub semantic_type: SemanticType,
    /// PostgreSQL type name usable in a `$n::type` cast (e.g. "int4", "timestamptz", "\"public\".\"mood\"").
    pub pg_type: String,
    pub nullable: bool,
}

impl ColumnDescriptor {
    pub fn new(name: &str, semantic_type: SemanticType, pg_type: &str) -> Self {
        ColumnDescriptor {
            name: name.to_string(),
            semantic_type,
            pg_type: pg_type.to_string(),
            nullable: true,
        }
    }
}

/// Immutable description of one table. Shared behind an `Arc` once loaded.
#[derive(Clone, Debug)]
pub struct EntityDescriptor {
    pub schema_name: String,
    pub table_name: String,
    columns: Vec<ColumnDescriptor>,
    by_name: HashMap<String, usize>,
}

impl EntityDescriptor {
    pub fn new(schema_name: &str, table_name: &str, columns: Vec<ColumnDescriptor>) -> Self {
        let by_name = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        EntityDescriptor {
            schema_name: schema_name.to_string(),
            table_name: table_name.to_string(),
            columns,
            by_name,
        }
    }

    /// Columns in ordinal order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.by_name.get(name).map(|&i| &self.columns[i])
    }

    pub fn column_type(&self, name: &str) -> Option<SemanticType> {
        self.column(name).map(|c| c.semantic_type)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }
}
