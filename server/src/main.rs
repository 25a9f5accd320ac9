//! Statesync Server - sync daemon for multi-master application state.
//!
//! Loads the local store from its state file, syncs it against the
//! configured remote stores on demand and on a timer, and saves it back on
//! shutdown.

use parking_lot::RwLock;
use statesync_engine::RecordStore;
use statesync_server::config::Config;
use statesync_server::scheduler::AutoSync;
use statesync_server::sync::{EngineOptions, SyncEngine, SyncRequest};
use statesync_server::{build_adapters, build_router, persist, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "statesync_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Statesync Server on {}:{}", config.host, config.port);

    // Restore local state
    let mut store = RecordStore::new();
    if let Some(snapshot) = persist::load_state(&config.state_file).await? {
        store.import(snapshot)?;
        tracing::info!(
            records = store.len(),
            path = %config.state_file.display(),
            "local state restored"
        );
    }

    let adapters = build_adapters(&config).await?;
    if adapters.is_empty() {
        tracing::warn!("no remote stores configured, sync will be a no-op");
    }

    let engine = Arc::new(SyncEngine::new(
        Arc::new(RwLock::new(store)),
        adapters,
        EngineOptions {
            key: config.sync_key.clone(),
            policy: config.policy,
        },
    ));

    let auto_sync = config
        .sync_interval
        .map(|period| AutoSync::start(engine.clone(), period, SyncRequest::default()));

    let state = AppState {
        engine: engine.clone(),
        config: Arc::new(config.clone()),
    };
    let app = build_router(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = auto_sync {
        handle.stop().await;
    }

    let snapshot = engine.store().read().export();
    persist::save_state(&config.state_file, &snapshot).await?;
    tracing::info!(records = snapshot.record_count(), "local state saved");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", err);
    }
    tracing::info!("shutting down");
}
