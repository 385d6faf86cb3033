//! HTTP surface of the analyser: event ingest, probes, Prometheus metrics

use analyser_lib::{
    health::{ComponentStatus, HealthRegistry},
    AnalyserMetrics,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: AnalyserMetrics,
    pub inbox_tx: mpsc::Sender<Value>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: AnalyserMetrics,
        inbox_tx: mpsc::Sender<Value>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            inbox_tx,
        }
    }
}

/// Accepts a raw pub/sub event and queues it for the engine loop.
/// 202 on enqueue, 503 once the loop has shut down.
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

/// Liveness probe. Degraded still answers 200 since the service keeps
/// analysing; only unhealthy flips to 503.
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health();
    let code = if health.status == ComponentStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(health))
}

/// Readiness probe.
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness();
    let code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(readiness))
}

/// Prometheus metrics endpoint
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

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/events", post(ingest_event))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Bind and serve the API until the process exits.
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}
