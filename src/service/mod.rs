//! Query pipeline execution and CRUD over registry entities.

mod crud;
mod executor;
mod relations;
mod rows;

pub use crud::{parse_id, CrudService};
pub use executor::{build_context, QueryExecutor, QueryOutcome};
pub use relations::eager_load;
pub use rows::row_to_json;
