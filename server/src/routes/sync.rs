//! Sync endpoint routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::error::Result;
use crate::persist;
use crate::sync::{EngineStatus, StateSyncResult, SyncRequest};
use crate::AppState;

/// Create sync routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sync", post(sync_handler))
        .route("/sync/status", get(status_handler))
        .route("/state/save", post(save_handler))
}

/// POST /sync - Run one sync. 409 when another sync is running.
async fn sync_handler(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> (StatusCode, Json<StateSyncResult>) {
    let result = state.engine.sync(request).await;

    let status = if result.is_rejected() {
        StatusCode::CONFLICT
    } else {
        StatusCode::OK
    };
    (status, Json(result))
}

/// GET /sync/status - Store summary and engine phase.
async fn status_handler(State(state): State<AppState>) -> Json<EngineStatus> {
    Json(state.engine.status())
}

/// POST /state/save - Write the local store to the state file.
async fn save_handler(State(state): State<AppState>) -> Result<StatusCode> {
    let snapshot = state.engine.store().read().export();
    persist::save_state(&state.config.state_file, &snapshot).await?;
    Ok(StatusCode::NO_CONTENT)
}
