#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use takeone_api::config::ServerConfig;
use takeone_api::router::build_app_router;
use takeone_api::state::AppState;
use takeone_capabilities::HashingEmbedder;
use takeone_db::MemoryVectorStore;
use takeone_pipeline::{Capabilities, SceneSearchService, ServiceSettings};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// Wide enough that the hashing embedder's bucket collisions never decide
/// a ranking in these tests.
pub const DIMENSION: usize = 4096;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        frames_root: None,
    }
}

/// A service on an in-memory store with the local hashing embedder and no
/// optional capabilities.
pub fn test_service() -> Arc<SceneSearchService> {
    let capabilities = Capabilities::new(
        Arc::new(HashingEmbedder::new(DIMENSION)),
        Arc::new(MemoryVectorStore::new(DIMENSION)),
    );
    Arc::new(SceneSearchService::new(capabilities, ServiceSettings::default()).unwrap())
}

/// Build the full application router (same middleware stack as `main.rs`)
/// around `service`.
pub fn build_test_app(service: Arc<SceneSearchService>) -> Router {
    build_test_app_with(service, test_config())
}

pub fn build_test_app_with(service: Arc<SceneSearchService>, config: ServerConfig) -> Router {
    let state = AppState {
        service,
        config: Arc::new(config.clone()),
        shutdown: CancellationToken::new(),
    };
    build_app_router(state, &config)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// JSON body for `POST /api/v1/segments`: a 5 s clip of `source`.
pub fn index_body(source: &str, clip: u32, description: &str) -> serde_json::Value {
    let start = f64::from(clip) * 5.0;
    serde_json::json!({
        "metadata": {
            "source_id": source,
            "clip_index": clip,
            "start_time": start,
            "end_time": start + 5.0,
            "clip_path": format!("clips/{source}_{clip}.mp4"),
        },
        "scene": {
            "description": description,
        },
    })
}

/// Index `descriptions` under `source`, clip indices in order.
pub async fn seed(service: &Arc<SceneSearchService>, source: &str, descriptions: &[&str]) {
    for (clip, description) in descriptions.iter().enumerate() {
        let app = build_test_app(Arc::clone(service));
        let response = post_json(
            app,
            "/api/v1/segments",
            index_body(source, clip as u32, description),
        )
        .await;
        assert_eq!(response.status(), 201);
    }
}
