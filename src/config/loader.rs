//! Load the registry from JSON and resolve it.

use crate::config::resolved::{EntityRegistry, RelationSpec, ResolvedEntity, Scope};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::path::Path;

/// Build the registry from config (validates first). `default_schema` applies where no schema is given.
pub fn resolve(config: &RegistryConfig, default_schema: &str) -> Result<EntityRegistry, ConfigError> {
    validate(config)?;
    let entities = config
        .entities
        .iter()
        .map(|e| resolve_entity(e, default_schema))
        .collect();
    Ok(EntityRegistry::new(entities))
}

fn resolve_entity(e: &EntityConfig, default_schema: &str) -> ResolvedEntity {
    let schema_name = e.schema.clone().unwrap_or_else(|| default_schema.to_string());
    let relations = e
        .relations
        .iter()
        .map(|r| {
            // validate() guarantees the key without a default is present
            let (our_key, their_key) = match r.kind {
                RelationKind::ToOne => (
                    r.our_key.clone().unwrap_or_default(),
                    r.their_key.clone().unwrap_or_else(default_primary_key),
                ),
                RelationKind::ToMany => (
                    r.our_key.clone().unwrap_or_else(|| e.primary_key.clone()),
                    r.their_key.clone().unwrap_or_default(),
                ),
            };
            RelationSpec {
                name: r.name.clone(),
                kind: r.kind,
                schema_name: r.schema.clone().unwrap_or_else(|| schema_name.clone()),
                table_name: r.table.clone(),
                our_key,
                their_key,
            }
        })
        .collect();
    let scopes = e
        .scopes
        .iter()
        .map(|s| (s.name.clone(), Scope::from_config(s)))
        .collect();
    ResolvedEntity {
        name: e.name.clone(),
        schema_name,
        table_name: e.table.clone(),
        primary_key: e.primary_key.clone(),
        relations,
        scopes,
    }
}

pub fn parse_registry(json: &str) -> Result<RegistryConfig, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Read and resolve a registry file.
pub async fn load_registry(path: impl AsRef<Path>, default_schema: &str) -> Result<EntityRegistry, ConfigError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let config = parse_registry(&text)?;
    let registry = resolve(&config, default_schema)?;
    tracing::info!(path = %path.display(), entities = config.entities.len(), "entity registry loaded");
    Ok(registry)
}
