//! Connector handlers: resolve the resource key from the path and run one operation.

use crate::error::AppError;
use crate::request::{FilterExpr, Payload};
use crate::service::FILTER_PARAM;
use crate::state::AppState;
use crate::value::Value;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::collections::HashMap;

const DENORMALIZE_PARAM: &str = "denormalize";

/// The descriptor document as loaded.
pub async fn descriptor(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.descriptor.document.clone())
}

pub async fn list(
    State(state): State<AppState>,
    Path(type_key): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, AppError> {
    let service = state.service();
    let out = match params.get(FILTER_PARAM).filter(|f| !f.trim().is_empty()) {
        Some(raw) => service.fetch_collection_filtered(&type_key, &FilterExpr::parse(raw)?).await?,
        None => service.fetch_collection(&type_key).await?,
    };
    Ok(Json(out))
}

pub async fn read(
    State(state): State<AppState>,
    Path((type_key, id)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, AppError> {
    let denormalize = params.get(DENORMALIZE_PARAM).is_some_and(|v| !v.is_empty());
    let out = state.service().fetch_one(&type_key, &id, denormalize).await?;
    Ok(Json(out))
}

pub async fn options(
    State(state): State<AppState>,
    Path(type_key): Path<String>,
    params: Payload,
) -> Result<Json<Value>, AppError> {
    let out = state.service().fetch_options(&type_key, &params).await?;
    Ok(Json(out))
}

pub async fn option(
    State(state): State<AppState>,
    Path((type_key, id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let out = state.service().fetch_one_as_option(&type_key, &id).await?;
    Ok(Json(out))
}

pub async fn create(
    State(state): State<AppState>,
    Path(type_key): Path<String>,
    payload: Payload,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let out = state.service().create(&type_key, &payload).await?;
    Ok((StatusCode::CREATED, Json(out)))
}

pub async fn update(
    State(state): State<AppState>,
    Path((type_key, id)): Path<(String, String)>,
    payload: Payload,
) -> Result<Json<Value>, AppError> {
    let out = state.service().update(&type_key, &id, &payload).await?;
    Ok(Json(out))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((type_key, id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let out = state.service().delete(&type_key, &id).await?;
    Ok(Json(out))
}
