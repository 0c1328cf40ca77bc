//! Routers: common (health, readiness, version) and entity CRUD.

pub mod common;
pub mod entity;

pub use common::{common_routes, common_routes_with_ready};
pub use entity::entity_routes;

use crate::state::AppState;
use axum::Router;

/// Everything the service exposes, merged into one router.
pub fn app(state: AppState) -> Router {
    common_routes_with_ready(state.clone()).merge(entity_routes(state))
}
