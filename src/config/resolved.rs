//! Resolved registry: config validated and flattened for runtime use.

use crate::config::{RelationKind, ScopeConfig, ScopeFilterConfig, ScopeOp};
use crate::error::ConfigError;
use crate::query::context::{Bound, FilterValue, Predicate};
use crate::query::predicate::typed_value;
use crate::schema::EntityDescriptor;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A relation that can be eager-loaded (`with=`) or, for to-many, counted (`sort=<name>_count`).
#[derive(Clone, Debug)]
pub struct RelationSpec {
    pub name: String,
    pub kind: RelationKind,
    pub schema_name: String,
    pub table_name: String,
    /// Our column used in the join (our FK for to_one; usually our PK for to_many).
    pub our_key: String,
    /// Their column used in the join (their PK for to_one; their FK for to_many).
    pub their_key: String,
}

pub type ScopeFn = dyn Fn(&EntityDescriptor) -> Vec<Predicate> + Send + Sync;

/// Named, pre-built filter. Applied by name from `scope=`; unknown names are no-ops.
#[derive(Clone)]
pub struct Scope {
    pub name: String,
    build: Arc<ScopeFn>,
}

impl Scope {
    pub fn new<F>(name: &str, build: F) -> Self
    where
        F: Fn(&EntityDescriptor) -> Vec<Predicate> + Send + Sync + 'static,
    {
        Scope {
            name: name.to_string(),
            build: Arc::new(build),
        }
    }

    pub fn predicates(&self, descriptor: &EntityDescriptor) -> Vec<Predicate> {
        (self.build)(descriptor)
    }

    /// Scope from config filters. Values are typed against the descriptor when applied;
    /// filters naming columns the table does not have are skipped.
    pub fn from_config(config: &ScopeConfig) -> Self {
        let filters = config.filters.clone();
        Scope::new(&config.name, move |descriptor| {
            filters.iter().filter_map(|f| scope_predicate(descriptor, f)).collect()
        })
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope").field("name", &self.name).finish_non_exhaustive()
    }
}

fn json_token(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scope_predicate(descriptor: &EntityDescriptor, f: &ScopeFilterConfig) -> Option<Predicate> {
    let column = descriptor.column(&f.column)?;
    let name = column.name.clone();
    if f.op == ScopeOp::In {
        let values: Vec<FilterValue> = f
            .value
            .as_array()?
            .iter()
            .filter_map(json_token)
            .filter_map(|t| typed_value(column, &t))
            .collect();
        return (!values.is_empty()).then_some(Predicate::SetIn { column: name, values });
    }
    let token = json_token(&f.value)?;
    if f.op == ScopeOp::Contains {
        return Some(Predicate::Contains { column: name, needle: token });
    }
    let value = typed_value(column, &token)?;
    Some(match f.op {
        ScopeOp::Gt => Predicate::Range { column: name, lower: Some(Bound::exclusive(value)), upper: None },
        ScopeOp::Gte => Predicate::Range { column: name, lower: Some(Bound::inclusive(value)), upper: None },
        ScopeOp::Lt => Predicate::Range { column: name, lower: None, upper: Some(Bound::exclusive(value)) },
        ScopeOp::Lte => Predicate::Range { column: name, lower: None, upper: Some(Bound::inclusive(value)) },
        _ => Predicate::Equals { column: name, value },
    })
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub name: String,
    pub schema_name: String,
    pub table_name: String,
    pub primary_key: String,
    pub relations: Vec<RelationSpec>,
    pub scopes: HashMap<String, Scope>,
}

impl ResolvedEntity {
    pub fn relation(&self, name: &str) -> Option<&RelationSpec> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn scope(&self, name: &str) -> Option<&Scope> {
        self.scopes.get(name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct EntityRegistry {
    entities: HashMap<String, Arc<ResolvedEntity>>,
}

impl EntityRegistry {
    pub fn new(entities: Vec<ResolvedEntity>) -> Self {
        EntityRegistry {
            entities: entities.into_iter().map(|e| (e.name.clone(), Arc::new(e))).collect(),
        }
    }

    pub fn entity(&self, name: &str) -> Option<Arc<ResolvedEntity>> {
        self.entities.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Register (or replace) a programmatic scope. Call before the registry is shared.
    pub fn register_scope(&mut self, entity: &str, scope: Scope) -> Result<(), ConfigError> {
        let e = self
            .entities
            .get_mut(entity)
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "entity",
                id: entity.to_string(),
            })?;
        Arc::make_mut(e).scopes.insert(scope.name.clone(), scope);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDescriptor, SemanticType};

    fn posts() -> EntityDescriptor {
        EntityDescriptor::new(
            "public",
            "posts",
            vec![
                ColumnDescriptor::new("published", SemanticType::Boolean, "bool"),
                ColumnDescriptor::new("rating", SemanticType::Integer, "int4"),
                ColumnDescriptor::new("state", SemanticType::Other, "\"public\".\"post_state\""),
            ],
        )
    }

    #[test]
    fn config_scope_types_values_per_column() {
        let cfg: ScopeConfig = serde_json::from_value(serde_json::json!({
            "name": "good",
            "filters": [
                { "column": "published", "op": "eq", "value": true },
                { "column": "rating", "op": "gte", "value": 4 },
                { "column": "state", "op": "in", "value": ["live", "pinned"] },
                { "column": "ghost", "op": "eq", "value": 1 }
            ]
        }))
        .unwrap();
        let preds = Scope::from_config(&cfg).predicates(&posts());
        assert_eq!(
            preds,
            vec![
                Predicate::Equals { column: "published".into(), value: FilterValue::Bool(true) },
                Predicate::Range {
                    column: "rating".into(),
                    lower: Some(Bound::inclusive(FilterValue::Int(4))),
                    upper: None
                },
                Predicate::SetIn {
                    column: "state".into(),
                    values: vec![FilterValue::Text("live".into()), FilterValue::Text("pinned".into())]
                },
            ]
        );
    }

    #[test]
    fn register_scope_on_unknown_entity_fails() {
        let mut registry = EntityRegistry::default();
        assert!(registry.register_scope("ghosts", Scope::new("x", |_| Vec::new())).is_err());
    }
}
