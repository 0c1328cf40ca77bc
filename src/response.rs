//! Standard response envelopes: `{data}`, `{data, meta}`.

use crate::service::QueryOutcome;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
}

#[derive(Serialize)]
pub struct SuccessMany<T, M> {
    pub data: Vec<T>,
    pub meta: M,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct PageMeta {
    pub total: i64,
    pub page: u64,
    pub per_page: u64,
    pub last_page: u64,
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { data }))
}

pub fn success_created<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::CREATED, Json(SuccessOne { data }))
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T, MetaCount>>) {
    let count = data.len() as u64;
    (StatusCode::OK, Json(SuccessMany { data, meta: MetaCount { count } }))
}

impl IntoResponse for QueryOutcome {
    fn into_response(self) -> Response {
        match self {
            QueryOutcome::Count(n) => success_one(n).into_response(),
            QueryOutcome::First(row) => success_one(row.unwrap_or(Value::Null)).into_response(),
            QueryOutcome::Rows(rows) => success_many(rows).into_response(),
            QueryOutcome::Page {
                rows,
                total,
                page,
                per_page,
                last_page,
            } => (
                StatusCode::OK,
                Json(SuccessMany {
                    data: rows,
                    meta: PageMeta {
                        total,
                        page,
                        per_page,
                        last_page,
                    },
                }),
            )
                .into_response(),
        }
    }
}
