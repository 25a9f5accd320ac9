//! Statesync Server - keeps a local record store in step with remote stores.
//!
//! The [`statesync_engine`] crate holds the records and the merge rules; this
//! crate adds everything that touches the outside world: remote store
//! adapters, the async sync engine, the auto-sync scheduler, the state file
//! and an HTTP surface for status and manual syncs.

pub mod adapter;
pub mod config;
pub mod db;
pub mod error;
pub mod persist;
pub mod routes;
pub mod scheduler;
pub mod sync;

use crate::adapter::{AdapterError, MemoryRemote, PgRemote, RemoteStore, RetryConfig, Retrying};
use crate::config::{Config, RemoteSpec};
use crate::sync::SyncEngine;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SyncEngine>,
    pub config: Arc<Config>,
}

/// Build the HTTP router with tracing and CORS layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Instantiate the configured remote stores, each wrapped with retries.
pub async fn build_adapters(
    config: &Config,
) -> Result<Vec<Arc<dyn RemoteStore>>, AdapterError> {
    let mut adapters: Vec<Arc<dyn RemoteStore>> = Vec::with_capacity(config.remotes.len());

    for spec in &config.remotes {
        let adapter: Arc<dyn RemoteStore> = match spec {
            RemoteSpec::Memory { id } => {
                Arc::new(Retrying::new(MemoryRemote::new(id.as_str()), RetryConfig::default()))
            }
            RemoteSpec::Postgres { id, url } => {
                let remote =
                    PgRemote::connect(id.as_str(), url, config.db_max_connections).await?;
                Arc::new(Retrying::new(remote, RetryConfig::default()))
            }
        };
        tracing::info!(store = %adapter.id(), "remote store configured");
        adapters.push(adapter);
    }

    Ok(adapters)
}
