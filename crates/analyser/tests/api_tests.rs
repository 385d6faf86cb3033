//! Integration tests for the analyser API endpoints

use analyser_lib::{
    health::{Component, ComponentStatus, HealthRegistry},
    AnalyserMetrics,
};
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceExt;

// The router under test mirrors api::create_router, rebuilt here because
// the binary crate's modules are not visible to integration tests.

#[derive(Clone)]
struct AppState {
    health_registry: HealthRegistry,
    metrics: AnalyserMetrics,
    inbox_tx: mpsc::Sender<Value>,
}

async fn ingest_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<Value>,
) -> impl IntoResponse {
    if state.inbox_tx.send(event).await.is_ok() {
        StatusCode::ACCEPTED
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health();
    let code = if health.status == ComponentStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness();
    let code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(readiness))
}

async fn metrics() -> impl IntoResponse {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&prometheus::gather(), &mut buffer)
        .unwrap();
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

fn test_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/events", post(ingest_event))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

fn setup_test_app() -> (Router, Arc<AppState>, mpsc::Receiver<Value>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(Component::Engine);
    health_registry.register(Component::EventLoop);

    let (inbox_tx, inbox_rx) = mpsc::channel(16);
    let state = Arc::new(AppState {
        health_registry,
        metrics: AnalyserMetrics::new(),
        inbox_tx,
    });
    (test_router(state.clone()), state, inbox_rx)
}

async fn get_path(app: Router, path: &str) -> Response {
    app.oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_events(app: Router, body: String) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/events")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_ingest_accepts_event_and_queues_it() {
    let (app, _state, mut inbox_rx) = setup_test_app();

    let payload = json!({"event_type": "QueryCreated", "id": "q-1"});
    let response = post_events(app, payload.to_string()).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let queued = inbox_rx.recv().await.unwrap();
    assert_eq!(queued["event_type"], "QueryCreated");
    assert_eq!(queued["id"], "q-1");
}

#[tokio::test]
async fn test_ingest_returns_503_when_loop_is_gone() {
    let (app, _state, inbox_rx) = setup_test_app();
    drop(inbox_rx);

    let response = post_events(app, r#"{"event_type":"QueryCreated"}"#.to_string()).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_ingest_rejects_non_json_body() {
    let (app, _state, _inbox_rx) = setup_test_app();

    let response = post_events(app, "not json".to_string()).await;
    assert_ne!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state, _inbox_rx) = setup_test_app();

    let response = get_path(app, "/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let (app, state, _inbox_rx) = setup_test_app();
    state
        .health_registry
        .set_degraded(Component::EventLoop, "Inbox backlog growing");

    // Degraded is still operational
    let response = get_path(app, "/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state, _inbox_rx) = setup_test_app();
    state
        .health_registry
        .set_unhealthy(Component::Engine, "Usage inference failed");

    let response = get_path(app, "/healthz").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["status"], "unhealthy");
}

#[tokio::test]
async fn test_healthz_includes_component_details() {
    let (app, _state, _inbox_rx) = setup_test_app();

    let health = body_json(get_path(app, "/healthz").await).await;
    assert!(health["components"]["engine"].is_object());
    assert!(health["components"]["event_loop"].is_object());
}

#[tokio::test]
async fn test_readyz_returns_503_when_not_ready() {
    let (app, _state, _inbox_rx) = setup_test_app();

    // Not ready until startup flips the flag
    let response = get_path(app, "/readyz").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["ready"], false);
}

#[tokio::test]
async fn test_readyz_returns_ok_when_ready() {
    let (app, state, _inbox_rx) = setup_test_app();
    state.health_registry.set_ready(true);

    let response = get_path(app, "/readyz").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ready"], true);
}

#[tokio::test]
async fn test_readyz_returns_503_when_ready_but_unhealthy() {
    let (app, state, _inbox_rx) = setup_test_app();
    state.health_registry.set_ready(true);
    state
        .health_registry
        .set_unhealthy(Component::Engine, "Usage inference failed");

    let response = get_path(app, "/readyz").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, state, _inbox_rx) = setup_test_app();

    state.metrics.observe_tick_latency(0.001);
    state.metrics.set_population(3, 1);
    state.metrics.set_overloaded_workers(1);
    state
        .metrics
        .inc_change_requests("ServiceWorkerOverloadedPlanRequested");

    let response = get_path(app, "/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap().clone();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let text = body_text(response).await;
    assert!(text.contains("analyser_tick_latency_seconds"));
    assert!(text.contains("analyser_workers_registered"));
    assert!(text.contains("analyser_overloaded_workers"));
    assert!(text.contains("analyser_change_requests_total"));
}

#[tokio::test]
async fn test_metrics_contains_histogram_buckets() {
    let (app, state, _inbox_rx) = setup_test_app();

    state.metrics.observe_tick_latency(0.001);
    state.metrics.observe_tick_latency(0.005);
    state.metrics.observe_tick_latency(0.01);

    let text = body_text(get_path(app, "/metrics").await).await;
    assert!(text.contains("analyser_tick_latency_seconds_bucket"));
    assert!(text.contains("analyser_tick_latency_seconds_count"));
    assert!(text.contains("analyser_tick_latency_seconds_sum"));
}
