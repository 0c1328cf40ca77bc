//! HTTP handlers for entity queries and CRUD.

pub mod entity;
pub use entity::*;
