//! Registry validation: unique snake_case names and complete relation keys.

use crate::case::to_snake_case;
use crate::config::{RegistryConfig, RelationKind};
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(config: &RegistryConfig) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for e in &config.entities {
        if e.name.trim().is_empty() || e.table.trim().is_empty() {
            return Err(ConfigError::Validation("entity name and table are required".into()));
        }
        if !names.insert(e.name.as_str()) {
            return Err(ConfigError::DuplicateName {
                kind: "entity",
                name: e.name.clone(),
            });
        }
        if e.primary_key.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{}: primary_key is empty", e.name)));
        }

        let mut relation_names = HashSet::new();
        for r in &e.relations {
            snake_case_name(&e.name, "relation", &r.name)?;
            if !relation_names.insert(r.name.as_str()) {
                return Err(ConfigError::DuplicateName {
                    kind: "relation",
                    name: format!("{}.{}", e.name, r.name),
                });
            }
            let missing = match r.kind {
                RelationKind::ToOne => r.our_key.is_none().then_some("our_key"),
                RelationKind::ToMany => r.their_key.is_none().then_some("their_key"),
            };
            if let Some(key) = missing {
                return Err(ConfigError::Validation(format!(
                    "{}.{}: {} is required for this relation kind",
                    e.name, r.name, key
                )));
            }
        }

        let mut scope_names = HashSet::new();
        for s in &e.scopes {
            snake_case_name(&e.name, "scope", &s.name)?;
            if !scope_names.insert(s.name.as_str()) {
                return Err(ConfigError::DuplicateName {
                    kind: "scope",
                    name: format!("{}.{}", e.name, s.name),
                });
            }
        }
    }
    Ok(())
}

/// Requested relation and scope names are normalized to snake_case before lookup.
fn snake_case_name(entity: &str, kind: &str, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() || to_snake_case(name) != name {
        return Err(ConfigError::Validation(format!(
            "{}.{}: {} names must be snake_case",
            entity, name, kind
        )));
    }
    Ok(())
}
