//! Shared fixtures: a small blog registry over an in-memory schema source.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use schema_query::schema::{ColumnDescriptor, SemanticType};
use schema_query::service::QueryExecutor;
use schema_query::{app, parse_registry, resolve, AppState, EntityRegistry, SchemaCatalog, StaticSchemaSource};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const REGISTRY: &str = r#"{
  "entities": [
    {
      "name": "posts", "table": "posts",
      "relations": [
        { "name": "comments", "kind": "to_many", "table": "comments", "their_key": "post_id" },
        { "name": "author", "kind": "to_one", "table": "users", "our_key": "author_id" },
        { "name": "likes", "kind": "to_many", "table": "likes", "their_key": "post_id" },
        { "name": "reviews", "kind": "to_many", "table": "comments", "their_key": "review_id" }
      ],
      "scopes": [
        { "name": "published", "filters": [{ "column": "published", "op": "eq", "value": true }] },
        { "name": "popular", "filters": [{ "column": "views", "op": "gte", "value": 1000 }] }
      ]
    },
    { "name": "orphans", "table": "orphans" }
  ]
}"#;

pub fn registry() -> EntityRegistry {
    resolve(&parse_registry(REGISTRY).expect("registry parses"), "public").expect("registry resolves")
}

fn col(name: &str, ty: SemanticType, pg: &str) -> ColumnDescriptor {
    ColumnDescriptor::new(name, ty, pg)
}

/// Tables for `posts`, `comments` and `users`. `orphans` and `likes` are deliberately absent.
pub fn source() -> StaticSchemaSource {
    StaticSchemaSource::new()
        .with_table(
            "public",
            "posts",
            vec![
                col("id", SemanticType::Integer, "int8"),
                col("title", SemanticType::String, "varchar"),
                col("body", SemanticType::Text, "text"),
                col("status", SemanticType::String, "varchar"),
                col("published", SemanticType::Boolean, "bool"),
                col("views", SemanticType::Integer, "int4"),
                col("rating", SemanticType::Float, "float8"),
                col("author_id", SemanticType::Integer, "int8"),
                col("publish_on", SemanticType::Date, "date"),
                col("created_at", SemanticType::DateTime, "timestamptz"),
                col("password", SemanticType::String, "varchar"),
                col("deleted_at", SemanticType::DateTime, "timestamptz"),
            ],
        )
        .with_table(
            "public",
            "comments",
            vec![
                col("id", SemanticType::Integer, "int8"),
                col("post_id", SemanticType::Integer, "int8"),
                col("body", SemanticType::Text, "text"),
            ],
        )
        .with_table(
            "public",
            "users",
            vec![
                col("id", SemanticType::Integer, "int8"),
                col("name", SemanticType::String, "varchar"),
            ],
        )
}

pub fn catalog() -> SchemaCatalog {
    SchemaCatalog::new(Arc::new(source()))
}

/// A pool that never connects successfully; only paths that stop before SQL succeed.
pub fn lazy_pool() -> PgPool {
    sqlx::postgres::PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(300))
        .connect_lazy("postgres://nobody@127.0.0.1:1/none")
        .expect("lazy pool")
}

pub fn executor() -> QueryExecutor {
    QueryExecutor::new(lazy_pool(), Arc::new(catalog()), 100)
}

pub fn router() -> Router {
    app(AppState::new(lazy_pool(), registry(), catalog(), 100))
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.expect("request handled")
}

pub async fn get(router: &Router, uri: &str) -> Response<Body> {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}
