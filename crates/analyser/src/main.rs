//! Adaptation Analyser - decision core of a self-adaptive video
//! analytics pipeline
//!
//! Consumes worker announcements and monitoring snapshots from the
//! pub/sub collaborator and emits prioritized scheduling change requests.

use analyser_lib::{
    health::{Component, HealthRegistry},
    AnalyserEngine, AnalyserMetrics, StructuredLogger,
};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod event_loop;

const ANALYSER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting adaptation-analyser");

    // Load configuration
    let config = config::AnalyserConfig::load()?;
    info!(service_name = %config.service_name, "Analyser configured");

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(Component::Engine);
    health_registry.register(Component::EventLoop);
    health_registry.register(Component::Ingest);

    // Initialize metrics
    let metrics = AnalyserMetrics::new();

    // Initialize structured logger
    let logger = StructuredLogger::new(&config.service_name);
    logger.log_startup(ANALYSER_VERSION);

    // Build the engine and the single-writer event loop around it
    let engine = AnalyserEngine::new(config.engine_settings());
    let loop_config = event_loop::EventLoopConfig {
        state_log_interval: Duration::from_secs(config.state_log_interval_secs),
        ..event_loop::EventLoopConfig::default()
    };
    let (event_loop, inbox_tx, mut outbound_rx) = event_loop::EventLoop::new(
        engine,
        loop_config,
        health_registry.clone(),
        logger.clone(),
    );

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
    let _loop_handle = tokio::spawn(event_loop.run(shutdown_tx.subscribe()));

    // Publish change-plan requests to the transport. The broker binding
    // lives outside this service; emitted requests go out as structured
    // log records the forwarder tails.
    let _publisher_handle = tokio::spawn(async move {
        while let Some(change_plan) = outbound_rx.recv().await {
            info!(
                event = "change_plan_published",
                event_id = %change_plan.id,
                request_type = %change_plan.change.request_type,
                payload = %serde_json::to_string(&change_plan).unwrap_or_default(),
                "Publishing change-plan request"
            );
        }
    });

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics.clone(),
        inbox_tx,
    ));

    // Mark analyser as ready after initialization
    health_registry.set_ready(true);

    // Start ingest, health and metrics server
    let _api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    let _ = shutdown_tx.send(());
    info!("Shutting down");

    Ok(())
}
