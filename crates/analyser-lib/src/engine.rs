//! Decision engine orchestrating the analyses
//!
//! One engine instance owns all mutable analysis state: the worker
//! registry, the fuzzy usage models, the debounce ledger and the current
//! execution plan. Events are processed to completion one at a time, so
//! callers must route every inbound channel through a single instance.
//!
//! Each monitoring tick runs the checks in fixed priority order and
//! emits at most one change-plan request: the first check that passes
//! its debounce window and finds something wins the tick.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Instant;
use tracing::info;

use crate::analysis::{
    Debouncer, Detection, IdleBestWorkerDetector, LoadSheddingVerifier, OverloadDetector,
};
use crate::error::AnalyserError;
use crate::events::{ChangePlanEvent, ChangeRequest, InboundEvent, RequestType};
use crate::fuzzy::UsageEstimator;
use crate::models::{ExecutionPlan, ServiceWorkersSnapshot};
use crate::observability::{AnalyserMetrics, StructuredLogger};
use crate::registry::WorkerRegistry;

/// Tunable knobs of the decision engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Service name used as the outbound event-id prefix.
    pub service_name: String,
    /// Monitoring window multiplier used to derive worker capacity.
    pub adaptation_delta: u32,
    /// Usage fraction at which a worker counts as overloaded.
    pub is_overloaded_percentage: f64,
    /// Debounce interval between same-typed requests, in seconds.
    pub min_seconds_to_ask_same_change_request_type: i64,
    /// Estimate usage with the fuzzy model; the crisp queue/capacity
    /// ratio is used when disabled.
    pub use_fuzzy_usage_analysis: bool,
    /// Run the load-shedding verifier on monitoring ticks. Off by
    /// default; the check is kept for operators who want it back.
    pub enable_load_shedding_check: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            service_name: "adaptation-analyser".to_string(),
            adaptation_delta: 10,
            is_overloaded_percentage: 0.7,
            min_seconds_to_ask_same_change_request_type: 3,
            use_fuzzy_usage_analysis: true,
            enable_load_shedding_check: false,
        }
    }
}

/// The analyse stage: consumes inbound events, produces at most one
/// prioritized change-plan request per monitoring tick.
pub struct AnalyserEngine {
    settings: EngineSettings,
    registry: WorkerRegistry,
    estimator: UsageEstimator,
    overload: OverloadDetector,
    best_idle: IdleBestWorkerDetector,
    load_shedding: LoadSheddingVerifier,
    debouncer: Debouncer,
    current_plan: Option<ExecutionPlan>,
    last_overloaded: Option<Vec<String>>,
    last_monitoring: Option<ServiceWorkersSnapshot>,
    reported_rebuilds: u64,
    logger: StructuredLogger,
    metrics: AnalyserMetrics,
}

impl AnalyserEngine {
    pub fn new(settings: EngineSettings) -> Self {
        let overload = OverloadDetector::new(
            settings.adaptation_delta,
            settings.is_overloaded_percentage,
            settings.use_fuzzy_usage_analysis,
        );
        let debouncer = Debouncer::new(settings.min_seconds_to_ask_same_change_request_type);
        let logger = StructuredLogger::new(settings.service_name.clone());
        Self {
            estimator: UsageEstimator::new(settings.adaptation_delta),
            overload,
            best_idle: IdleBestWorkerDetector::new(),
            load_shedding: LoadSheddingVerifier::new(),
            debouncer,
            registry: WorkerRegistry::new(),
            current_plan: None,
            last_overloaded: None,
            last_monitoring: None,
            reported_rebuilds: 0,
            logger,
            metrics: AnalyserMetrics::new(),
            settings,
        }
    }

    /// Process one inbound event, returning the change-plan request it
    /// produced, if any.
    pub fn handle_event(
        &mut self,
        event: InboundEvent,
    ) -> Result<Option<ChangePlanEvent>, AnalyserError> {
        self.handle_event_at(event, Utc::now())
    }

    fn handle_event_at(
        &mut self,
        event: InboundEvent,
        now: DateTime<Utc>,
    ) -> Result<Option<ChangePlanEvent>, AnalyserError> {
        match event {
            InboundEvent::QueryCreated { payload } => {
                Ok(Some(self.emit(RequestType::NewQueryScheduling, payload, now)))
            }
            InboundEvent::ServiceWorkerAnnounced { worker } => {
                self.logger.log_worker_announced(
                    &worker.stream_key,
                    &worker.service_type,
                    worker.queue_size,
                    worker.throughput,
                );
                self.estimator.observe(&worker);
                self.sync_model_rebuilds();
                self.registry.announce(worker);
                self.metrics.set_population(
                    self.registry.worker_count() as i64,
                    self.registry.groups().len() as i64,
                );
                Ok(None)
            }
            InboundEvent::ServiceWorkersStreamMonitored { service_workers } => {
                self.monitoring_tick(service_workers, now)
            }
            InboundEvent::ServiceWorkerSlrProfilesRanked { payload } => Ok(Some(self.emit(
                RequestType::ServiceWorkerSlrProfileChange,
                payload,
                now,
            ))),
            InboundEvent::SchedulingPlanExecuted { plan } => {
                info!(
                    request_type = %plan.change_request.request_type,
                    strategy = %plan.execution_plan.strategy.name,
                    "scheduling plan executed, arming debounce window"
                );
                self.debouncer.record_execution(
                    plan.change_request.request_type,
                    plan.change_request.timestamp,
                );
                self.current_plan = Some(plan.execution_plan);
                Ok(None)
            }
        }
    }

    /// One decision tick over a monitored population snapshot.
    fn monitoring_tick(
        &mut self,
        snapshot: ServiceWorkersSnapshot,
        now: DateTime<Utc>,
    ) -> Result<Option<ChangePlanEvent>, AnalyserError> {
        let started = Instant::now();
        let detection = self.run_analyses(&snapshot, now)?;
        self.sync_model_rebuilds();

        let worker_count = snapshot.values().map(|g| g.workers.len()).sum();
        self.logger.log_monitoring_tick(
            worker_count,
            detection.as_ref().map(|d| d.request_type.as_str()),
        );
        self.last_monitoring = Some(snapshot);
        self.metrics
            .observe_tick_latency(started.elapsed().as_secs_f64());

        Ok(detection.map(|d| self.emit(d.request_type, d.cause, now)))
    }

    /// Run the checks in priority order; the first hit wins the tick.
    fn run_analyses(
        &mut self,
        snapshot: &ServiceWorkersSnapshot,
        now: DateTime<Utc>,
    ) -> Result<Option<Detection>, AnalyserError> {
        // The overload set is only valid within one tick; a suppressed
        // overload check must not leave a stale set behind for the
        // load-shedding branch.
        self.last_overloaded = None;

        if self.debouncer.allow(RequestType::ServiceWorkerOverloaded, now) {
            let overloaded = self
                .overload
                .overloaded_workers(snapshot, &mut self.estimator)?;
            self.metrics.set_overloaded_workers(overloaded.len() as i64);
            let detection = self.overload.detection_for(&overloaded);
            self.last_overloaded = Some(overloaded);
            if detection.is_some() {
                return Ok(detection);
            }
        } else {
            self.suppressed(RequestType::ServiceWorkerOverloaded);
        }

        if self.debouncer.allow(RequestType::ServiceWorkerBestIdle, now) {
            if let Some(detection) = self.best_idle.check(snapshot, &self.registry) {
                return Ok(Some(detection));
            }
        } else {
            self.suppressed(RequestType::ServiceWorkerBestIdle);
        }

        if self.settings.enable_load_shedding_check {
            if self
                .debouncer
                .allow(RequestType::UnnecessaryLoadShedding, now)
            {
                let overloaded: HashSet<String> = match &self.last_overloaded {
                    Some(keys) => keys.iter().cloned().collect(),
                    None => self
                        .overload
                        .overloaded_workers(snapshot, &mut self.estimator)?
                        .into_iter()
                        .collect(),
                };
                if let Some(detection) =
                    self.load_shedding.check(self.current_plan.as_ref(), &overloaded)
                {
                    return Ok(Some(detection));
                }
            } else {
                self.suppressed(RequestType::UnnecessaryLoadShedding);
            }
        }

        Ok(None)
    }

    fn suppressed(&self, request_type: RequestType) {
        self.logger.log_debounce_suppressed(request_type.as_str());
        self.metrics.inc_debounce_suppressed();
    }

    /// Push model builds the estimator performed since the last sync.
    fn sync_model_rebuilds(&mut self) {
        let total = self.estimator.rebuilds();
        if total > self.reported_rebuilds {
            self.metrics
                .add_model_rebuilds(total - self.reported_rebuilds);
            self.reported_rebuilds = total;
        }
    }

    /// Build and account for one outbound change-plan event.
    fn emit(&self, request_type: RequestType, cause: Value, now: DateTime<Utc>) -> ChangePlanEvent {
        let id = event_id(&self.settings.service_name);
        self.metrics.inc_change_requests(request_type.as_str());
        self.logger
            .log_change_request(&id, request_type.as_str(), &cause.to_string());
        ChangePlanEvent {
            id,
            change: ChangeRequest {
                request_type,
                cause,
                timestamp: now,
            },
        }
    }

    /// Log a snapshot of the engine state.
    pub fn log_state(&self) {
        self.logger.log_state(
            self.registry.worker_count(),
            self.registry.groups().len(),
            self.current_plan.is_some(),
        );
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    pub fn current_plan(&self) -> Option<&ExecutionPlan> {
        self.current_plan.as_ref()
    }

    /// The population snapshot from the most recent monitoring tick.
    pub fn last_monitoring(&self) -> Option<&ServiceWorkersSnapshot> {
        self.last_monitoring.as_ref()
    }
}

impl Default for AnalyserEngine {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

/// Generate a namespaced event id for outbound events.
fn event_id(service_name: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}:{:x}{:x}", service_name, now.as_secs(), now.subsec_nanos())
}
