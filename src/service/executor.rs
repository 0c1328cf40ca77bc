//! The fixed query pipeline: scopes, filters, exclusions, sort, shape, then eager loading.

use crate::case::to_snake_case;
use crate::config::ResolvedEntity;
use crate::error::{AppError, ConfigError, DirectiveError};
use crate::query::params::{SCOPE, WITH};
use crate::query::{
    build, ignored, resolve_shape, resolve_sort, Predicate, QueryContext, QueryParams, ShapeDirective, SortKey,
    SortTarget,
};
use crate::schema::{EntityDescriptor, SchemaCatalog};
use crate::service::relations::{eager_load, related_table};
use crate::service::rows::{fetch_all, fetch_count, fetch_optional};
use crate::sql::{select_count, select_distinct, select_rows};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;

/// Result of one listing, shaped by the `return` / `page` / `take` directives.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Count(i64),
    First(Option<Value>),
    Rows(Vec<Value>),
    Page {
        rows: Vec<Value>,
        total: i64,
        page: u64,
        per_page: u64,
        last_page: u64,
    },
}

#[derive(Clone)]
pub struct QueryExecutor {
    pool: PgPool,
    catalog: Arc<SchemaCatalog>,
    max_page_size: u64,
}

impl QueryExecutor {
    pub fn new(pool: PgPool, catalog: Arc<SchemaCatalog>, max_page_size: u64) -> Self {
        QueryExecutor {
            pool,
            catalog,
            max_page_size,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Descriptor of the entity's table. The primary key must be one of its columns.
    pub async fn describe(&self, entity: &ResolvedEntity) -> Result<Arc<EntityDescriptor>, AppError> {
        let descriptor = self.catalog.describe(&entity.schema_name, &entity.table_name).await?;
        if !descriptor.has_column(&entity.primary_key) {
            return Err(ConfigError::MissingReference {
                kind: "column",
                id: format!("{}.{}", entity.table_name, entity.primary_key),
            }
            .into());
        }
        Ok(descriptor)
    }

    /// Resolve every directive in `params` against the entity. Only the schema catalog is consulted.
    pub async fn prepare(&self, entity: Arc<ResolvedEntity>, params: &QueryParams) -> Result<QueryContext, AppError> {
        let descriptor = self.describe(&entity).await?;
        let ctx = build_context(entity, descriptor, params, self.max_page_size);
        let sort = self.countable_sort(&ctx).await?;
        Ok(ctx.with_sort(sort))
    }

    /// Drop relation-count keys whose related table or join columns are not in the catalog.
    async fn countable_sort(&self, ctx: &QueryContext) -> Result<Vec<SortKey>, AppError> {
        let mut out = Vec::with_capacity(ctx.sort.len());
        for key in &ctx.sort {
            if let SortTarget::RelationCount(name) = &key.target {
                let usable = match ctx.entity.relation(name) {
                    Some(rel) => {
                        ctx.descriptor.has_column(&rel.our_key) && related_table(self, rel).await?.is_some()
                    }
                    None => false,
                };
                if !usable {
                    ignored(&DirectiveError::Unsupported(format!("count of unavailable relation '{}'", name)));
                    continue;
                }
            }
            out.push(key.clone());
        }
        Ok(out)
    }

    pub async fn run(&self, entity: Arc<ResolvedEntity>, params: &QueryParams) -> Result<QueryOutcome, AppError> {
        let ctx = self.prepare(entity, params).await?;
        self.execute(&ctx).await
    }

    pub async fn execute(&self, ctx: &QueryContext) -> Result<QueryOutcome, AppError> {
        let outcome = match &ctx.shape {
            ShapeDirective::Count => QueryOutcome::Count(fetch_count(&self.pool, &select_count(ctx)).await?),
            ShapeDirective::Distinct(column) => {
                let q = select_distinct(ctx, column).unwrap_or_else(|| select_rows(ctx));
                // projected rows have nothing to attach relations to
                return Ok(QueryOutcome::Rows(fetch_all(&self.pool, &q).await?));
            }
            ShapeDirective::First => QueryOutcome::First(fetch_optional(&self.pool, &select_rows(ctx)).await?),
            ShapeDirective::Paginate { page, per_page } => {
                let total = fetch_count(&self.pool, &select_count(ctx)).await?;
                let rows = fetch_all(&self.pool, &select_rows(ctx)).await?;
                QueryOutcome::Page {
                    rows,
                    total,
                    page: *page,
                    per_page: *per_page,
                    last_page: last_page(total, *per_page),
                }
            }
            ShapeDirective::Take(_) | ShapeDirective::All => {
                QueryOutcome::Rows(fetch_all(&self.pool, &select_rows(ctx)).await?)
            }
        };
        self.attach_relations(ctx, outcome).await
    }

    async fn attach_relations(&self, ctx: &QueryContext, outcome: QueryOutcome) -> Result<QueryOutcome, AppError> {
        if ctx.relations.is_empty() {
            return Ok(outcome);
        }
        Ok(match outcome {
            QueryOutcome::Rows(mut rows) => {
                eager_load(self, &ctx.entity, &mut rows, &ctx.relations).await?;
                QueryOutcome::Rows(rows)
            }
            QueryOutcome::First(Some(row)) => {
                let mut rows = vec![row];
                eager_load(self, &ctx.entity, &mut rows, &ctx.relations).await?;
                QueryOutcome::First(rows.pop())
            }
            QueryOutcome::Page {
                mut rows,
                total,
                page,
                per_page,
                last_page,
            } => {
                eager_load(self, &ctx.entity, &mut rows, &ctx.relations).await?;
                QueryOutcome::Page {
                    rows,
                    total,
                    page,
                    per_page,
                    last_page,
                }
            }
            other => other,
        })
    }
}

/// Run every resolver stage in order, each one returning a new context.
pub fn build_context(
    entity: Arc<ResolvedEntity>,
    descriptor: Arc<EntityDescriptor>,
    params: &QueryParams,
    max_page_size: u64,
) -> QueryContext {
    let scopes = scope_predicates(&entity, &descriptor, params);
    let (filters, exclusions) = build(&descriptor, &entity.primary_key, params);
    let sort = resolve_sort(&entity, &descriptor, params);
    let shape = resolve_shape(&descriptor, params, max_page_size);
    let relations = requested_relations(&entity, params);
    QueryContext::new(entity, descriptor)
        .with_scopes(scopes)
        .with_filters(filters, exclusions)
        .with_sort(sort)
        .with_shape(shape)
        .with_relations(relations)
}

fn scope_predicates(entity: &ResolvedEntity, descriptor: &EntityDescriptor, params: &QueryParams) -> Vec<Predicate> {
    let mut out = Vec::new();
    for name in params.list(SCOPE) {
        match entity.scope(&to_snake_case(name)) {
            Some(scope) => out.extend(scope.predicates(descriptor)),
            None => ignored(&DirectiveError::UnknownScope(name.to_string())),
        }
    }
    out
}

/// Relation names from `with=`, normalized and deduplicated. Unknown names are dropped here.
pub(crate) fn requested_relations(entity: &ResolvedEntity, params: &QueryParams) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in params.list(WITH) {
        let normalized = to_snake_case(name);
        if entity.relation(&normalized).is_none() {
            ignored(&DirectiveError::UnknownRelation(name.to_string()));
            continue;
        }
        if !out.contains(&normalized) {
            out.push(normalized);
        }
    }
    out
}

fn last_page(total: i64, per_page: u64) -> u64 {
    let total = u64::try_from(total).unwrap_or(0);
    if per_page == 0 {
        return 1;
    }
    total.div_ceil(per_page).max(1)
}
