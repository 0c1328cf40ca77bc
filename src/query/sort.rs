//! `sort=column[:asc|desc],<relation>_count[:dir],...`

use crate::case::to_snake_case;
use crate::config::{RelationKind, ResolvedEntity};
use crate::error::DirectiveError;
use crate::query::context::{SortDirection, SortKey, SortTarget};
use crate::query::ignored;
use crate::query::params::{QueryParams, SORT};
use crate::schema::EntityDescriptor;

/// Suffix that turns a relation name into a "count of related rows" sort key.
pub const COUNT_SUFFIX: &str = "_count";

pub fn resolve_sort(entity: &ResolvedEntity, descriptor: &EntityDescriptor, params: &QueryParams) -> Vec<SortKey> {
    params
        .list(SORT)
        .into_iter()
        .filter_map(|item| match sort_key(entity, descriptor, item) {
            Ok(key) => Some(key),
            Err(e) => {
                ignored(&e);
                None
            }
        })
        .collect()
}

fn sort_key(entity: &ResolvedEntity, descriptor: &EntityDescriptor, item: &str) -> Result<SortKey, DirectiveError> {
    let (name, direction) = match item.split_once(':') {
        Some((name, dir)) => (
            name.trim(),
            SortDirection::parse(dir.trim())
                .ok_or_else(|| DirectiveError::Unsupported(format!("sort direction '{}'", dir)))?,
        ),
        None => (item.trim(), SortDirection::Asc),
    };
    if descriptor.has_column(name) {
        return Ok(SortKey {
            target: SortTarget::Column(name.to_string()),
            direction,
        });
    }
    let relation = name
        .strip_suffix(COUNT_SUFFIX)
        .ok_or_else(|| DirectiveError::UnknownColumn(name.to_string()))?;
    let spec = entity
        .relation(&to_snake_case(relation))
        .ok_or_else(|| DirectiveError::UnknownRelation(relation.to_string()))?;
    if spec.kind != RelationKind::ToMany {
        return Err(DirectiveError::Unsupported(format!("count of to-one relation '{}'", spec.name)));
    }
    Ok(SortKey {
        target: SortTarget::RelationCount(spec.name.clone()),
        direction,
    })
}
