//! Result shape from `return`, `page`/`limit` and `take`, in that precedence.

use crate::error::DirectiveError;
use crate::query::context::ShapeDirective;
use crate::query::ignored;
use crate::query::params::{QueryParams, LIMIT, PAGE, RETURN, TAKE};
use crate::query::predicate::is_denied;
use crate::schema::EntityDescriptor;

const UNIQUE_PREFIX: &str = "unique:";

pub fn resolve_shape(descriptor: &EntityDescriptor, params: &QueryParams, max_limit: u64) -> ShapeDirective {
    if let Some(ret) = params.get(RETURN) {
        match return_shape(descriptor, ret.trim()) {
            Ok(shape) => return shape,
            Err(e) => ignored(&e),
        }
    }
    let page = params.get(PAGE).and_then(parse_count);
    let limit = params.get(LIMIT).and_then(parse_count).filter(|&n| n > 0);
    if let (Some(page), Some(limit)) = (page, limit) {
        let (page, per_page) = (page.max(1), limit.min(max_limit));
        if offset_fits(page, per_page) {
            return ShapeDirective::Paginate { page, per_page };
        }
        ignored(&DirectiveError::Unsupported(format!("page={} beyond the last representable offset", page)));
    }
    if let Some(take) = params.get(TAKE).and_then(parse_count) {
        return ShapeDirective::Take(take.min(max_limit));
    }
    ShapeDirective::All
}

fn return_shape(descriptor: &EntityDescriptor, ret: &str) -> Result<ShapeDirective, DirectiveError> {
    match ret {
        "count" => Ok(ShapeDirective::Count),
        "first" => Ok(ShapeDirective::First),
        _ => {
            let column = ret
                .strip_prefix(UNIQUE_PREFIX)
                .ok_or_else(|| DirectiveError::Unsupported(format!("return={}", ret)))?
                .trim();
            if descriptor.has_column(column) && !is_denied(column) {
                Ok(ShapeDirective::Distinct(column.to_string()))
            } else {
                Err(DirectiveError::UnknownColumn(column.to_string()))
            }
        }
    }
}

/// OFFSET is a bigint in PostgreSQL.
fn offset_fits(page: u64, per_page: u64) -> bool {
    (page - 1)
        .checked_mul(per_page)
        .is_some_and(|offset| i64::try_from(offset).is_ok())
}

fn parse_count(s: &str) -> Option<u64> {
    s.trim().parse().ok()
}
