//! Generic CRUD against PostgreSQL for registry entities.

use crate::config::ResolvedEntity;
use crate::error::AppError;
use crate::query::predicate::typed_value;
use crate::query::{FilterValue, QueryParams};
use crate::schema::{ColumnDescriptor, EntityDescriptor};
use crate::service::executor::{requested_relations, QueryExecutor, QueryOutcome};
use crate::service::relations::eager_load;
use crate::service::rows::fetch_optional;
use crate::sql::{delete, insert, select_by_id, update};
use serde_json::{Map, Value};
use std::sync::Arc;

pub struct CrudService;

impl CrudService {
    /// Filtered, sorted, shaped listing. See [`QueryExecutor::run`].
    pub async fn list(
        executor: &QueryExecutor,
        entity: Arc<ResolvedEntity>,
        params: &QueryParams,
    ) -> Result<QueryOutcome, AppError> {
        executor.run(entity, params).await
    }

    /// Insert one row from the body keys that are columns of the table. Returns the created row.
    pub async fn create(
        executor: &QueryExecutor,
        entity: &ResolvedEntity,
        body: &Map<String, Value>,
    ) -> Result<Value, AppError> {
        let descriptor = executor.describe(entity).await?;
        let q = insert(&descriptor, body);
        fetch_optional(executor.pool(), &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Fetch one row by primary key, with the relations named in `with`. Other directives do not apply.
    pub async fn read(
        executor: &QueryExecutor,
        entity: &ResolvedEntity,
        id: &str,
        params: &QueryParams,
    ) -> Result<Value, AppError> {
        let descriptor = executor.describe(entity).await?;
        let (pk, id_value) = primary_key(&descriptor, entity, id)?;
        let row = fetch_optional(executor.pool(), &select_by_id(&descriptor, pk, &id_value))
            .await?
            .ok_or_else(|| not_found(entity, id))?;
        let mut rows = vec![row];
        eager_load(executor, entity, &mut rows, &requested_relations(entity, params)).await?;
        rows.pop().ok_or_else(|| not_found(entity, id))
    }

    /// Update one row by primary key. Not-found when no row has that key.
    pub async fn update(
        executor: &QueryExecutor,
        entity: &ResolvedEntity,
        id: &str,
        body: &Map<String, Value>,
    ) -> Result<Value, AppError> {
        let descriptor = executor.describe(entity).await?;
        let (pk, id_value) = primary_key(&descriptor, entity, id)?;
        let q = update(&descriptor, pk, &id_value, body);
        fetch_optional(executor.pool(), &q)
            .await?
            .ok_or_else(|| not_found(entity, id))
    }

    /// Delete one row by primary key. Returns the deleted row.
    pub async fn delete(executor: &QueryExecutor, entity: &ResolvedEntity, id: &str) -> Result<Value, AppError> {
        let descriptor = executor.describe(entity).await?;
        let (pk, id_value) = primary_key(&descriptor, entity, id)?;
        fetch_optional(executor.pool(), &delete(&descriptor, pk, &id_value))
            .await?
            .ok_or_else(|| not_found(entity, id))
    }
}

/// The primary key column and `raw` typed against it. An id that cannot be of that type matches no row.
fn primary_key<'a>(
    descriptor: &'a EntityDescriptor,
    entity: &ResolvedEntity,
    raw: &str,
) -> Result<(&'a ColumnDescriptor, FilterValue), AppError> {
    let pk = descriptor
        .column(&entity.primary_key)
        .ok_or_else(|| not_found(entity, raw))?;
    let value = parse_id(pk, raw).ok_or_else(|| not_found(entity, raw))?;
    Ok((pk, value))
}

pub fn parse_id(pk: &ColumnDescriptor, raw: &str) -> Option<FilterValue> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    typed_value(pk, raw)
}

fn not_found(entity: &ResolvedEntity, id: &str) -> AppError {
    AppError::NotFound(format!("{} '{}'", entity.name, id))
}
