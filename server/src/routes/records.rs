//! Local record routes.
//!
//! Direct reads and writes of the local store. Writes go through the same
//! store methods the merge step uses, under the same lock.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use statesync_engine::{Payload, StateRecord, StoreSnapshot};

use crate::error::{AppError, Result};
use crate::AppState;

/// Default page size for record listings.
const DEFAULT_LIMIT: usize = 100;

/// Maximum page size for record listings.
const MAX_LIMIT: usize = 1000;

/// Create record routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/records", get(list_records).post(create_record))
        .route(
            "/records/{id}",
            get(get_record).patch(update_record).delete(delete_record),
        )
        .route("/export", get(export_state))
}

/// Query parameters for listing records.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

/// Body for creating a record.
#[derive(Debug, Deserialize)]
pub struct CreateRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub data: Payload,
}

/// GET /records - Records oldest first, optionally filtered by type.
async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<StateRecord>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }

    let store = state.engine.store().read();
    let mut q = store.query().offset(query.offset.unwrap_or(0)).limit(limit);
    if let Some(record_type) = query.record_type {
        q = q.of_type(record_type);
    }
    Ok(Json(q.all().into_iter().cloned().collect()))
}

/// POST /records - Create a record.
async fn create_record(
    State(state): State<AppState>,
    Json(body): Json<CreateRecord>,
) -> Result<(StatusCode, Json<StateRecord>)> {
    if body.record_type.trim().is_empty() {
        return Err(AppError::BadRequest("type must not be empty".into()));
    }

    let record = state
        .engine
        .store()
        .write()
        .create(body.record_type, body.data)
        .clone();
    tracing::debug!(id = %record.id, "record created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /records/{id}
async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StateRecord>> {
    state
        .engine
        .store()
        .read()
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("record {id}")))
}

/// PATCH /records/{id} - Shallow-merge the body into the record's data.
async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<Payload>,
) -> Result<Json<StateRecord>> {
    let mut store = state.engine.store().write();
    let record = store.update(&id, patch)?.clone();
    Ok(Json(record))
}

/// DELETE /records/{id}
async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.engine.store().write().delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /export - The snapshot document of the local store.
async fn export_state(State(state): State<AppState>) -> Json<StoreSnapshot> {
    Json(state.engine.store().read().export())
}
