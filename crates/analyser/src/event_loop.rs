//! Event processing loop
//!
//! Routes every inbound channel through one engine instance so all
//! mutable analysis state has a single writer. Raw JSON events arrive on
//! the inbox channel, change-plan requests leave on the outbound channel.

use analyser_lib::{
    health::{Component, HealthRegistry},
    parse_inbound, AnalyserEngine, AnalyserMetrics, ChangePlanEvent, StructuredLogger,
};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::info;

/// Configuration for the event loop
#[derive(Debug, Clone)]
pub struct EventLoopConfig {
    /// Interval between engine state log lines
    pub state_log_interval: Duration,
    /// Inbox channel buffer size
    pub buffer_size: usize,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            state_log_interval: Duration::from_secs(30),
            buffer_size: 1000,
        }
    }
}

/// Single-writer loop that owns the decision engine.
pub struct EventLoop {
    engine: AnalyserEngine,
    config: EventLoopConfig,
    inbox_rx: mpsc::Receiver<Value>,
    outbound_tx: mpsc::Sender<ChangePlanEvent>,
    health: HealthRegistry,
    logger: StructuredLogger,
    metrics: AnalyserMetrics,
}

impl EventLoop {
    /// Create the loop plus the channel handles the transport uses to
    /// feed raw events in and drain change-plan requests out.
    pub fn new(
        engine: AnalyserEngine,
        config: EventLoopConfig,
        health: HealthRegistry,
        logger: StructuredLogger,
    ) -> (Self, mpsc::Sender<Value>, mpsc::Receiver<ChangePlanEvent>) {
        let (inbox_tx, inbox_rx) = mpsc::channel(config.buffer_size);
        let (outbound_tx, outbound_rx) = mpsc::channel(config.buffer_size);

        let loop_instance = Self {
            engine,
            config,
            inbox_rx,
            outbound_tx,
            health,
            logger,
            metrics: AnalyserMetrics::new(),
        };

        (loop_instance, inbox_tx, outbound_rx)
    }

    /// Run until the inbox closes or shutdown is signalled.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!("Starting analyser event loop");
        self.health.set_healthy(Component::EventLoop);

        let mut state_ticker = interval(self.config.state_log_interval);
        // The first tick fires immediately; skip it.
        state_ticker.tick().await;

        loop {
            tokio::select! {
                maybe_event = self.inbox_rx.recv() => {
                    match maybe_event {
                        Some(raw) => self.process(raw).await,
                        None => {
                            info!("Event inbox closed, stopping event loop");
                            break;
                        }
                    }
                }
                _ = state_ticker.tick() => {
                    self.engine.log_state();
                }
                _ = shutdown.recv() => {
                    info!("Shutting down analyser event loop");
                    break;
                }
            }
        }
    }

    /// Process one raw inbound event. Failures are logged and counted;
    /// they never take the loop down.
    async fn process(&mut self, raw: Value) {
        let event_type = raw
            .get("event_type")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        let event = match parse_inbound(raw) {
            Ok(Some(event)) => event,
            Ok(None) => {
                self.logger.log_unknown_event(&event_type);
                return;
            }
            Err(error) => {
                self.logger.log_event_error(&error.to_string());
                self.metrics.inc_event_errors();
                return;
            }
        };

        match self.engine.handle_event(event) {
            Ok(outcome) => {
                self.health.set_healthy(Component::Engine);
                if let Some(change_plan) = outcome {
                    if self.outbound_tx.send(change_plan).await.is_err() {
                        self.logger
                            .log_event_error("outbound channel closed, dropping change request");
                    }
                }
            }
            Err(error) => {
                self.health
                    .set_degraded(Component::Engine, error.to_string());
                self.logger.log_event_error(&error.to_string());
                self.metrics.inc_event_errors();
            }
        }
    }
}
