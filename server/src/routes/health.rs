//! Liveness endpoint.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use statesync_engine::StoreId;

use crate::sync::SyncPhase;
use crate::AppState;

/// Liveness plus a one-line view of the engine.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub records: usize,
    pub phase: SyncPhase,
    pub adapters: Vec<StoreId>,
    pub auto_sync: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
}

/// GET /health - Never touches a remote store.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        records: state.engine.store().read().len(),
        phase: state.engine.phase(),
        adapters: state.engine.adapter_ids(),
        auto_sync: state.config.sync_interval.is_some(),
    })
}

async fn root() -> &'static str {
    "statesync"
}
