//! Eager loading of named relations onto already-fetched rows.
//!
//! One batched `WHERE their_key IN (...)` query per relation; results are stitched back by key.

use crate::config::{RelationKind, RelationSpec, ResolvedEntity};
use crate::error::{AppError, DirectiveError};
use crate::query::ignored;
use crate::schema::EntityDescriptor;
use crate::service::executor::QueryExecutor;
use crate::service::rows::fetch_all;
use crate::sql::select_by_column_in;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Attach each relation in `names` to every row under the relation's name.
/// Unknown relations and relations whose table is not in the catalog are skipped.
pub async fn eager_load(
    executor: &QueryExecutor,
    entity: &ResolvedEntity,
    rows: &mut [Value],
    names: &[String],
) -> Result<(), AppError> {
    if rows.is_empty() {
        return Ok(());
    }
    for name in names {
        let Some(rel) = entity.relation(name) else {
            ignored(&DirectiveError::UnknownRelation(name.clone()));
            continue;
        };
        let Some(related) = related_table(executor, rel).await? else {
            continue;
        };
        let Some(their_col) = related.column(&rel.their_key) else {
            continue;
        };
        let keys = distinct_keys(rows, &rel.our_key);
        let children = if keys.is_empty() {
            Vec::new()
        } else {
            fetch_all(executor.pool(), &select_by_column_in(&related, their_col, &keys)).await?
        };
        stitch(rows, rel, children);
    }
    Ok(())
}

/// Descriptor of the relation's table when it is in the catalog and has the join column.
/// Catalog misses are logged and reported as `None`; persistence errors propagate.
pub(crate) async fn related_table(
    executor: &QueryExecutor,
    rel: &RelationSpec,
) -> Result<Option<Arc<EntityDescriptor>>, AppError> {
    let related = match executor.catalog().describe(&rel.schema_name, &rel.table_name).await {
        Ok(d) => d,
        Err(AppError::Config(e)) => {
            tracing::warn!(relation = %rel.name, error = %e, "relation table unavailable, skipping");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    if !related.has_column(&rel.their_key) {
        tracing::warn!(relation = %rel.name, column = %rel.their_key, "relation key column missing, skipping");
        return Ok(None);
    }
    Ok(Some(related))
}

/// Lookup key for a JSON scalar. Numbers and their text rendering (numeric columns come back as text) collide.
fn key_of(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn distinct_keys(rows: &[Value], column: &str) -> Vec<Value> {
    let mut seen = std::collections::HashSet::new();
    rows.iter()
        .filter_map(|r| r.get(column))
        .filter(|v| key_of(v).is_some_and(|k| seen.insert(k)))
        .cloned()
        .collect()
}

fn stitch(rows: &mut [Value], rel: &RelationSpec, children: Vec<Value>) {
    let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
    for child in children {
        if let Some(k) = child.get(&rel.their_key).and_then(key_of) {
            grouped.entry(k).or_default().push(child);
        }
    }
    for row in rows.iter_mut() {
        let matches = row
            .get(&rel.our_key)
            .and_then(key_of)
            .and_then(|k| grouped.get(&k))
            .cloned()
            .unwrap_or_default();
        let value = match rel.kind {
            RelationKind::ToMany => Value::Array(matches),
            RelationKind::ToOne => matches.into_iter().next().unwrap_or(Value::Null),
        };
        if let Value::Object(map) = row {
            map.insert(rel.name.clone(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::posts_entity;
    use serde_json::json;

    #[test]
    fn to_many_groups_children_by_key() {
        let entity = posts_entity();
        let rel = entity.relation("comments").unwrap();
        let mut rows = vec![json!({"id": 1}), json!({"id": 2})];
        let children = vec![
            json!({"id": 10, "post_id": 1}),
            json!({"id": 11, "post_id": 1}),
            json!({"id": 12, "post_id": 9}),
        ];
        stitch(&mut rows, rel, children);
        assert_eq!(rows[0]["comments"].as_array().unwrap().len(), 2);
        assert_eq!(rows[1]["comments"], json!([]));
    }

    #[test]
    fn to_one_attaches_object_or_null() {
        let entity = posts_entity();
        let rel = entity.relation("author").unwrap();
        let mut rows = vec![json!({"id": 1, "author_id": 7}), json!({"id": 2, "author_id": null})];
        stitch(&mut rows, rel, vec![json!({"id": 7, "name": "ann"})]);
        assert_eq!(rows[0]["author"], json!({"id": 7, "name": "ann"}));
        assert_eq!(rows[1]["author"], Value::Null);
    }

    #[test]
    fn keys_are_distinct_and_non_null() {
        let rows = vec![
            json!({"author_id": 7}),
            json!({"author_id": 7}),
            json!({"author_id": null}),
            json!({}),
            json!({"author_id": 8}),
        ];
        assert_eq!(distinct_keys(&rows, "author_id"), vec![json!(7), json!(8)]);
    }

    #[test]
    fn numeric_text_and_numbers_share_keys() {
        assert_eq!(key_of(&json!(5)), key_of(&json!("5")));
        assert_eq!(key_of(&Value::Null), None);
    }
}
