//! Observability infrastructure for the adaptation analyser
//!
//! Provides:
//! - Prometheus metrics (tick latency, population gauges, request counters)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_gauge, register_int_gauge_vec, Histogram, IntGauge,
    IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AnalyserMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct AnalyserMetricsInner {
    tick_latency_seconds: Histogram,
    workers_registered: IntGauge,
    service_types: IntGauge,
    overloaded_workers: IntGauge,
    change_requests: IntGaugeVec,
    debounce_suppressed: IntGauge,
    model_rebuilds: IntGauge,
    event_errors: IntGauge,
}

impl AnalyserMetricsInner {
    fn new() -> Self {
        Self {
            tick_latency_seconds: register_histogram!(
                "analyser_tick_latency_seconds",
                "Time spent running one decision tick over the monitored population",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register tick_latency_seconds"),

            workers_registered: register_int_gauge!(
                "analyser_workers_registered",
                "Number of service workers currently known to the registry"
            )
            .expect("Failed to register workers_registered"),

            service_types: register_int_gauge!(
                "analyser_service_types",
                "Number of distinct service types with at least one worker"
            )
            .expect("Failed to register service_types"),

            overloaded_workers: register_int_gauge!(
                "analyser_overloaded_workers",
                "Number of workers the last tick found overloaded"
            )
            .expect("Failed to register overloaded_workers"),

            change_requests: register_int_gauge_vec!(
                "analyser_change_requests_total",
                "Total change-plan requests emitted, by request type",
                &["type"]
            )
            .expect("Failed to register change_requests_total"),

            debounce_suppressed: register_int_gauge!(
                "analyser_debounce_suppressed_total",
                "Total analyses skipped because their request type was debounced"
            )
            .expect("Failed to register debounce_suppressed_total"),

            model_rebuilds: register_int_gauge!(
                "analyser_model_rebuilds_total",
                "Total fuzzy usage model rebuilds triggered by throughput growth"
            )
            .expect("Failed to register model_rebuilds_total"),

            event_errors: register_int_gauge!(
                "analyser_event_errors_total",
                "Total inbound events that failed processing"
            )
            .expect("Failed to register event_errors_total"),
        }
    }
}

/// Analyser metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct AnalyserMetrics {
    // This is just a marker - we use the global instance
    _private: (),
}

impl Default for AnalyserMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyserMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AnalyserMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AnalyserMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record a decision tick latency observation
    pub fn observe_tick_latency(&self, duration_secs: f64) {
        self.inner().tick_latency_seconds.observe(duration_secs);
    }

    /// Update population gauges after a registry change
    pub fn set_population(&self, workers: i64, service_types: i64) {
        self.inner().workers_registered.set(workers);
        self.inner().service_types.set(service_types);
    }

    /// Update the overloaded worker count from the last tick
    pub fn set_overloaded_workers(&self, count: i64) {
        self.inner().overloaded_workers.set(count);
    }

    /// Increment the emitted-request counter for a request type
    pub fn inc_change_requests(&self, request_type: &str) {
        self.inner()
            .change_requests
            .with_label_values(&[request_type])
            .inc();
    }

    /// Increment the debounce-suppressed counter
    pub fn inc_debounce_suppressed(&self) {
        self.inner().debounce_suppressed.inc();
    }

    /// Add to the fuzzy model rebuild counter
    pub fn add_model_rebuilds(&self, count: u64) {
        self.inner().model_rebuilds.add(count as i64);
    }

    /// Increment the event error counter
    pub fn inc_event_errors(&self) {
        self.inner().event_errors.inc();
    }
}

/// Structured logger for analyser events
///
/// Provides consistent JSON-formatted logging for change requests,
/// population changes, and other significant events.
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Log an emitted change-plan request
    pub fn log_change_request(&self, event_id: &str, request_type: &str, cause: &str) {
        info!(
            event = "change_request_emitted",
            service = %self.service_name,
            event_id = %event_id,
            request_type = %request_type,
            cause = %cause,
            "Change-plan request emitted"
        );
    }

    /// Log a worker announcement
    pub fn log_worker_announced(
        &self,
        stream_key: &str,
        service_type: &str,
        queue_size: u64,
        throughput: f64,
    ) {
        info!(
            event = "worker_announced",
            service = %self.service_name,
            stream_key = %stream_key,
            service_type = %service_type,
            queue_size = queue_size,
            throughput = throughput,
            "Service worker announced"
        );
    }

    /// Log the outcome of one monitoring tick
    pub fn log_monitoring_tick(&self, worker_count: usize, emitted: Option<&str>) {
        info!(
            event = "monitoring_tick",
            service = %self.service_name,
            worker_count = worker_count,
            emitted = ?emitted,
            "Processed worker monitoring snapshot"
        );
    }

    /// Log an analysis skipped by the debouncer
    pub fn log_debounce_suppressed(&self, request_type: &str) {
        info!(
            event = "analysis_debounced",
            service = %self.service_name,
            request_type = %request_type,
            "Analysis skipped inside debounce window"
        );
    }

    /// Log a snapshot of the engine state
    pub fn log_state(&self, workers: usize, service_types: usize, has_current_plan: bool) {
        info!(
            event = "engine_state",
            service = %self.service_name,
            workers = workers,
            service_types = service_types,
            has_current_plan = has_current_plan,
            "Engine state snapshot"
        );
    }

    /// Log an inbound event type the analyser does not handle
    pub fn log_unknown_event(&self, event_type: &str) {
        info!(
            event = "unknown_event_ignored",
            service = %self.service_name,
            event_type = %event_type,
            "Ignoring unhandled event type"
        );
    }

    /// Log a failure while processing one inbound event
    pub fn log_event_error(&self, error: &str) {
        warn!(
            event = "event_processing_failed",
            service = %self.service_name,
            error = %error,
            "Inbound event processing failed"
        );
    }

    /// Log analyser startup
    pub fn log_startup(&self, version: &str) {
        info!(
            event = "analyser_started",
            service = %self.service_name,
            analyser_version = %version,
            "Adaptation analyser started"
        );
    }

    /// Log analyser shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "analyser_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Adaptation analyser shutting down"
        );
    }
}
