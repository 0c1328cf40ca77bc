//! Running built statements and turning rows into JSON.

use crate::error::AppError;
use crate::sql::QueryBuf;
use serde_json::{Map, Number, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row, TypeInfo};

fn bound(q: &QueryBuf) -> Query<'_, Postgres, PgArguments> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    q.params
        .iter()
        .fold(sqlx::query(&q.sql), |query, p| query.bind(p.clone()))
}

pub async fn fetch_all(pool: &PgPool, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
    let rows = bound(q).fetch_all(pool).await?;
    Ok(rows.iter().map(row_to_json).collect())
}

pub async fn fetch_optional(pool: &PgPool, q: &QueryBuf) -> Result<Option<Value>, AppError> {
    let row = bound(q).fetch_optional(pool).await?;
    Ok(row.as_ref().map(row_to_json))
}

/// First column of the single result row as a count.
pub async fn fetch_count(pool: &PgPool, q: &QueryBuf) -> Result<i64, AppError> {
    let row = bound(q).fetch_one(pool).await?;
    Ok(row.try_get::<i64, _>(0)?)
}

pub fn row_to_json(row: &PgRow) -> Value {
    let map: Map<String, Value> = row
        .columns()
        .iter()
        .map(|c| (c.name().to_string(), cell_to_value(row, c.ordinal(), c.type_info().name())))
        .collect();
    Value::Object(map)
}

fn float(n: Option<f64>) -> Option<Value> {
    n.and_then(Number::from_f64).map(Value::Number)
}

/// Decode one cell by its reported type. NULLs and undecodable cells become `null`.
fn cell_to_value(row: &PgRow, idx: usize, type_name: &str) -> Value {
    let decoded: Result<Option<Value>, sqlx::Error> = match type_name {
        "BOOL" => row.try_get::<Option<bool>, _>(idx).map(|v| v.map(Value::Bool)),
        "INT2" => row.try_get::<Option<i16>, _>(idx).map(|v| v.map(Value::from)),
        "INT4" => row.try_get::<Option<i32>, _>(idx).map(|v| v.map(Value::from)),
        "INT8" => row.try_get::<Option<i64>, _>(idx).map(|v| v.map(Value::from)),
        "FLOAT4" => row.try_get::<Option<f32>, _>(idx).map(|v| float(v.map(f64::from))),
        "FLOAT8" => row.try_get::<Option<f64>, _>(idx).map(float),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(idx)
            .map(|v| v.map(|u| Value::String(u.to_string()))),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)
            .map(|v| v.map(|d| Value::String(d.to_rfc3339()))),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)
            .map(|v| v.map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(idx)
            .map(|v| v.map(|d| Value::String(d.format("%Y-%m-%d").to_string()))),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(idx),
        _ => row.try_get::<Option<String>, _>(idx).map(|v| v.map(Value::String)),
    };
    match decoded {
        Ok(v) => v.unwrap_or(Value::Null),
        Err(e) => {
            tracing::debug!(column = idx, type_name, error = %e, "undecodable cell");
            Value::Null
        }
    }
}
