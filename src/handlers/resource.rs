//! Resource handlers: the REST pattern mapped onto service calls.
//!
//! ```text
//! GET  /                      index
//! GET  /{resource}            filtered/paginated page
//! GET  /{resource}/{ids}      one object, or a comma-delimited id batch
//! GET  /{resource}/{ids}/{a}  one attribute
//! POST /{resource}            create (query params form the relation clause)
//! POST /{resource}/{ids}      create with pre-assigned ids
//! POST /{resource}/{ids}/{a}  set an attribute
//! ```

use crate::args::{parse_scalar, Fields, Where};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

struct PageParams {
    target: Where,
    fields: Fields,
    limit: Option<i64>,
    offset: Option<i64>,
    sort: Option<String>,
}

/// `limit`/`offset`/`sort`/`fields` are reserved; every other query parameter
/// is a filter entry. Comma-delimited values become lists.
fn page_params(params: HashMap<String, String>) -> PageParams {
    let mut out = PageParams {
        target: Where::None,
        fields: Fields::None,
        limit: None,
        offset: None,
        sort: None,
    };
    let mut filter = Map::new();
    for (k, v) in params {
        match k.as_str() {
            "limit" => out.limit = v.parse().ok(),
            "offset" => out.offset = v.parse().ok(),
            "sort" => out.sort = Some(v),
            "fields" => out.fields = Fields::Raw(v),
            _ => {
                filter.insert(k, query_value(&v));
            }
        }
    }
    if !filter.is_empty() {
        out.target = Where::Filter(filter);
    }
    out
}

fn query_value(v: &str) -> Value {
    if v.contains(',') {
        Value::Array(
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(parse_scalar)
                .collect(),
        )
    } else {
        parse_scalar(v)
    }
}

/// Non-reserved query parameters on a create form the relation clause.
fn relation_clause(params: HashMap<String, String>) -> Where {
    let filter: Map<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k, query_value(&v)))
        .collect();
    if filter.is_empty() {
        Where::None
    } else {
        Where::Filter(filter)
    }
}

pub async fn index(State(state): State<AppState>) -> Json<Value> {
    Json(state.registry.index())
}

pub async fn list(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let svc = state.registry.get(&resource)?;
    let p = page_params(params);
    let doc = svc.get(p.target, p.fields, p.limit, p.offset, p.sort).await?;
    Ok((StatusCode::OK, Json(doc)))
}

pub async fn read(
    State(state): State<AppState>,
    Path((resource, ids)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let svc = state.registry.get(&resource)?;
    let p = page_params(params);
    let doc = svc
        .get(Where::Raw(ids), p.fields, p.limit, p.offset, p.sort)
        .await?;
    Ok((StatusCode::OK, Json(doc)))
}

pub async fn read_attr(
    State(state): State<AppState>,
    Path((resource, ids, attr)): Path<(String, String, String)>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let svc = state.registry.get(&resource)?;
    let doc = svc
        .get(Where::Raw(ids), Fields::One(attr), None, None, None)
        .await?;
    Ok((StatusCode::OK, Json(doc)))
}

pub async fn create(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let svc = state.registry.get(&resource)?;
    let doc = svc.post(body, relation_clause(params), Fields::None).await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

pub async fn create_with_ids(
    State(state): State<AppState>,
    Path((resource, ids)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let svc = state.registry.get(&resource)?;
    let doc = svc.post(body, Where::Raw(ids), Fields::None).await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

pub async fn update_attr(
    State(state): State<AppState>,
    Path((resource, ids, attr)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let svc = state.registry.get(&resource)?;
    let doc = svc.post(body, Where::Raw(ids), Fields::One(attr)).await?;
    Ok((StatusCode::OK, Json(doc)))
}
