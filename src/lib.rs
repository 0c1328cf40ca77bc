//! Schema Query: turns HTTP-style query parameters into safe, parameterized PostgreSQL queries
//! over tables described by a runtime schema catalog.

pub mod case;
pub mod config;
pub mod error;
pub mod handlers;
pub mod query;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;

pub use config::{init_tracing, load_registry, parse_registry, resolve, EntityRegistry, ResolvedEntity, Scope, Settings};
pub use error::{AppError, ConfigError, DirectiveError};
pub use query::{QueryContext, QueryParams};
pub use response::{success_created, success_many, success_one};
pub use routes::{app, common_routes, common_routes_with_ready, entity_routes};
pub use schema::{PgSchemaSource, SchemaCatalog, SchemaSource, StaticSchemaSource};
pub use service::{CrudService, QueryExecutor, QueryOutcome};
pub use state::AppState;
