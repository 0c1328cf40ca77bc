//! Entity routes. The entity is resolved from the path segment by the handlers.

use crate::handlers::entity::{create, delete as delete_handler, list, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;

/// Request bodies above this size are rejected with 413.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/:entity", get(list).post(create))
        .route("/:entity/:id", get(read).patch(update).delete(delete_handler))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}
