//! Query translation: raw parameters to an immutable [`QueryContext`].

pub mod context;
pub mod decoder;
pub mod params;
pub mod predicate;
pub mod shape;
pub mod sort;

pub use context::{
    Bound, Exclusion, FilterValue, Predicate, QueryContext, ShapeDirective, SortDirection, SortKey, SortTarget,
};
pub use params::QueryParams;
pub use predicate::{build, build_exclusions, build_filters, DENYLIST};
pub use shape::resolve_shape;
pub use sort::resolve_sort;

use crate::error::DirectiveError;

/// Boundary for best-effort directives: log and move on.
pub(crate) fn ignored(err: &DirectiveError) {
    tracing::debug!(error = %err, "ignoring directive");
}
