//! Core data models for the adaptation analyser

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Latest announced metrics for one service worker.
///
/// Overwritten on every `ServiceWorkerAnnounced` event; never deleted
/// (there is no deregistration path in the monitored population).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerMetrics {
    /// Stream key uniquely identifying the worker
    pub stream_key: String,
    /// Service type this worker executes
    pub service_type: String,
    /// Current input queue backlog
    pub queue_size: u64,
    /// Events processed per time unit
    pub throughput: f64,
    /// Energy consumption, when the worker reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_consumption: Option<f64>,
    /// Model accuracy, when the worker reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl WorkerMetrics {
    /// Queue capacity over one monitoring window of `adaptation_delta`
    /// time units.
    pub fn capacity(&self, adaptation_delta: u32) -> u64 {
        (self.throughput * f64::from(adaptation_delta)).floor() as u64
    }

    /// A worker with an empty queue is idle.
    pub fn is_idle(&self) -> bool {
        self.queue_size == 0
    }
}

/// All workers of one service type, as delivered by a monitoring event
/// or maintained by the registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceTypeGroup {
    /// Workers keyed by stream key
    pub workers: HashMap<String, WorkerMetrics>,
    /// Worker count reported by the monitoring source
    pub total_number_workers: usize,
}

/// Monitored worker population, keyed by service type.
pub type ServiceWorkersSnapshot = HashMap<String, ServiceTypeGroup>;

/// The execution side of a scheduling plan, delivered by the external
/// plan-executed notification and consumed by the load-shedding verifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionPlan {
    #[serde(default)]
    pub strategy: ExecutionStrategy,
}

/// Named execution strategy with its candidate dataflows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionStrategy {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dataflows: Vec<DataflowChoice>,
}

/// One candidate dataflow of a load-shedding strategy: the shedding
/// weight assigned to it and the worker path it routes through (each hop
/// lists the stream keys it may traverse).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataflowChoice {
    pub load_shedding: f64,
    pub path: Vec<Vec<String>>,
}

impl DataflowChoice {
    /// Whether this candidate actually sheds load.
    pub fn sheds_load(&self) -> bool {
        self.load_shedding > 0.0
    }

    /// Iterator over every stream key on the candidate's path.
    pub fn worker_keys(&self) -> impl Iterator<Item = &str> {
        self.path.iter().flatten().map(String::as_str)
    }
}

/// Payload of a `SchedulingPlanExecuted` notification: the change request
/// the plan answered plus the plan that is now live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutedPlan {
    pub change_request: ExecutedChangeRequest,
    #[serde(default)]
    pub execution_plan: ExecutionPlan,
}

/// The request a deployed plan was generated for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutedChangeRequest {
    #[serde(rename = "type")]
    pub request_type: crate::events::RequestType,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
