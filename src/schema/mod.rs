//! Schema catalog: column names and semantic types per table.

mod catalog;
pub mod source;
pub mod types;

pub use catalog::SchemaCatalog;
pub use source::{PgSchemaSource, SchemaSource, StaticSchemaSource};
pub use types::{ColumnDescriptor, EntityDescriptor, SemanticType};
