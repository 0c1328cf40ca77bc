//! Raw registry config as read from JSON.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// We hold the foreign key (`our_key`) pointing at their key.
    ToOne,
    /// They hold the foreign key (`their_key`) pointing at our key.
    ToMany,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationConfig {
    pub name: String,
    pub kind: RelationKind,
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    /// Defaults to the primary key for to_many.
    #[serde(default)]
    pub our_key: Option<String>,
    /// Defaults to `id` for to_one.
    #[serde(default)]
    pub their_key: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeOp {
    Eq,
    Contains,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScopeFilterConfig {
    pub column: String,
    pub op: ScopeOp,
    pub value: serde_json::Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub name: String,
    #[serde(default)]
    pub filters: Vec<ScopeFilterConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Public name, used as the route segment.
    pub name: String,
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default)]
    pub relations: Vec<RelationConfig>,
    #[serde(default)]
    pub scopes: Vec<ScopeConfig>,
}

pub fn default_primary_key() -> String {
    "id".into()
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}
