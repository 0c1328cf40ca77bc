//! Entity handlers: list, create, read, update, delete.

use crate::config::ResolvedEntity;
use crate::error::AppError;
use crate::query::QueryParams;
use crate::response::{success_created, success_one};
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

fn entity(state: &AppState, name: &str) -> Result<Arc<ResolvedEntity>, AppError> {
    state
        .registry
        .entity(name)
        .ok_or_else(|| AppError::NotFound(format!("entity '{}'", name)))
}

fn body_object(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &name)?;
    let outcome = CrudService::list(&state.executor(), entity, &QueryParams::from(params)).await?;
    Ok(outcome)
}

pub async fn create(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &name)?;
    let body = body_object(body)?;
    let row = CrudService::create(&state.executor(), &entity, &body).await?;
    Ok(success_created(row))
}

pub async fn read(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &name)?;
    let row = CrudService::read(&state.executor(), &entity, &id, &QueryParams::from(params)).await?;
    Ok(success_one(row))
}

pub async fn update(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &name)?;
    let body = body_object(body)?;
    let row = CrudService::update(&state.executor(), &entity, &id, &body).await?;
    Ok(success_one(row))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &name)?;
    let row = CrudService::delete(&state.executor(), &entity, &id).await?;
    Ok(success_one(row))
}
