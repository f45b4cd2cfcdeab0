#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use asyncops_api::config::{ServerConfig, TaskBackend};
use asyncops_api::router::build_app_router;
use asyncops_api::state::AppState;
use asyncops_db::store::{MemoryTaskStore, MemoryUserStore, TaskStore};
use asyncops_queue::{MemoryQueue, QueueBackend};
use asyncops_worker::pacing::StepPacing;
use asyncops_worker::{Outcome, TaskExecutor};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        backend: TaskBackend::Memory,
        embedded_workers: false,
    }
}

/// In-memory backends behind a test app. Workers are not running; tests
/// drive them with [`TestApp::run_worker`].
pub struct TestApp {
    pub router: Router,
    pub tasks: Arc<MemoryTaskStore>,
    pub users: Arc<MemoryUserStore>,
    pub queue: Arc<MemoryQueue>,
    pub executor: TaskExecutor,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Claim and execute every queued item.
    pub async fn run_worker(&self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while let Some(delivery) = self.queue.claim_next("test-worker").await.unwrap() {
            outcomes.push(self.executor.execute(&delivery).await);
        }
        outcomes
    }
}

/// Build the full application router over in-memory backends.
pub fn build_test_app() -> TestApp {
    build_test_app_with(Arc::new(MemoryTaskStore::new()), Arc::new(MemoryQueue::new()))
}

/// Like [`build_test_app`], but the router uses the given task store and
/// queue (the worker side still uses the memory ones).
pub fn build_test_app_with(tasks: Arc<MemoryTaskStore>, queue: Arc<MemoryQueue>) -> TestApp {
    let users = Arc::new(MemoryUserStore::new());
    let executor = TaskExecutor::new(
        tasks.clone(),
        users.clone(),
        queue.clone(),
        StepPacing::none(),
    );
    let state = AppState::new(tasks.clone(), queue.clone(), test_config());
    TestApp {
        router: build_app_router(state),
        tasks,
        users,
        queue,
        executor,
    }
}

/// Build a router over arbitrary task store and queue implementations.
pub fn build_router(tasks: Arc<dyn TaskStore>, queue: Arc<dyn QueueBackend>) -> Router {
    build_app_router(AppState::new(tasks, queue, test_config()))
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn send(app: Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn patch_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(body)).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}
