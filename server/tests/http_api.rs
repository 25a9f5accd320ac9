//! HTTP surface tests, driven through the router without a socket.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use parking_lot::RwLock;
use serde_json::{json, Value};
use statesync_engine::RecordStore;
use statesync_server::adapter::{MemoryRemote, RemoteStore};
use statesync_server::config::Config;
use statesync_server::sync::{EngineOptions, SyncEngine};
use statesync_server::{build_router, AppState};
use std::sync::Arc;
use tower::ServiceExt;

fn app(remote: Arc<MemoryRemote>) -> Router {
    let adapters: Vec<Arc<dyn RemoteStore>> = vec![remote];
    let engine = SyncEngine::new(
        Arc::new(RwLock::new(RecordStore::new())),
        adapters,
        EngineOptions::default(),
    );
    let config = Config::from_lookup(|_| None).unwrap();
    build_router(AppState {
        engine: Arc::new(engine),
        config: Arc::new(config),
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = app(Arc::new(MemoryRemote::new("kv")));
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["records"], 0);
    assert_eq!(body["phase"], "idle");
    assert_eq!(body["adapters"], json!(["kv"]));
    assert_eq!(body["autoSync"], false);

    send(
        &app,
        "POST",
        "/records",
        Some(json!({"type": "deployment", "data": {"app": "x"}})),
    )
    .await;
    let (_, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(body["records"], 1);
}

#[tokio::test]
async fn test_record_crud() {
    let app = app(Arc::new(MemoryRemote::new("kv")));

    let (status, created) = send(
        &app,
        "POST",
        "/records",
        Some(json!({"type": "deployment", "data": {"app": "x", "env": "prod"}})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["version"], 1);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/records/{id}"),
        Some(json!({"env": "staging"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["version"], 2);
    assert_eq!(updated["data"]["app"], "x");
    assert_ne!(updated["fingerprint"], created["fingerprint"]);

    let (status, listed) = send(&app, "GET", "/records?type=deployment&limit=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &format!("/records/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/records/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_rejects_zero_limit() {
    let app = app(Arc::new(MemoryRemote::new("kv")));
    let (status, _) = send(&app, "GET", "/records?limit=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sync_endpoint_pushes_and_reports() {
    let remote = Arc::new(MemoryRemote::new("kv"));
    let app = app(remote.clone());

    send(
        &app,
        "POST",
        "/records",
        Some(json!({"type": "deployment", "data": {"app": "x"}})),
    )
    .await;

    let (status, body) = send(&app, "GET", "/sync/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pendingCount"], 1);
    assert_eq!(body["phase"], "idle");

    let (status, result) = send(&app, "POST", "/sync", Some(json!({"direction": "both"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["success"], true);
    assert_eq!(result["synced"].as_array().unwrap().len(), 1);
    assert_eq!(remote.store_calls(), 1);

    let (_, body) = send(&app, "GET", "/sync/status", None).await;
    assert_eq!(body["pendingCount"], 0);
    assert!(body["lastSync"].is_string());
}

#[tokio::test]
async fn test_export_document_shape() {
    let app = app(Arc::new(MemoryRemote::new("kv")));
    send(
        &app,
        "POST",
        "/records",
        Some(json!({"type": "crm_account", "data": {"name": "Acme"}})),
    )
    .await;

    let (status, doc) = send(&app, "GET", "/export", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["records"].as_object().unwrap().len(), 1);
    assert_eq!(doc["hash"].as_str().unwrap().len(), 64);
}
