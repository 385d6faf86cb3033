//! Inbound and outbound event types
//!
//! The analyser consumes a small set of inbound events from the pub/sub
//! collaborator and emits change-plan requests in a uniform envelope.
//! The transport itself is out of scope; only the shapes live here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AnalyserError;
use crate::models::{ExecutedPlan, ServiceWorkersSnapshot, WorkerMetrics};

/// Typed reason for requesting a new scheduling plan.
///
/// The serialized form doubles as the outbound event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestType {
    #[serde(rename = "NewQuerySchedulingPlanRequested")]
    NewQueryScheduling,
    #[serde(rename = "ServiceWorkerOverloadedPlanRequested")]
    ServiceWorkerOverloaded,
    #[serde(rename = "ServiceWorkerBestIdlePlanRequested")]
    ServiceWorkerBestIdle,
    #[serde(rename = "UnnecessaryLoadSheddingPlanRequested")]
    UnnecessaryLoadShedding,
    #[serde(rename = "ServiceWorkerSLRProfileChangePlanRequested")]
    ServiceWorkerSlrProfileChange,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::NewQueryScheduling => "NewQuerySchedulingPlanRequested",
            RequestType::ServiceWorkerOverloaded => "ServiceWorkerOverloadedPlanRequested",
            RequestType::ServiceWorkerBestIdle => "ServiceWorkerBestIdlePlanRequested",
            RequestType::UnnecessaryLoadShedding => "UnnecessaryLoadSheddingPlanRequested",
            RequestType::ServiceWorkerSlrProfileChange => {
                "ServiceWorkerSLRProfileChangePlanRequested"
            }
        }
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of output signaling the planner that a new scheduling plan is
/// warranted, with a typed cause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequest {
    #[serde(rename = "type")]
    pub request_type: RequestType,
    pub cause: Value,
    pub timestamp: DateTime<Utc>,
}

/// Uniform outbound envelope `{id, change}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePlanEvent {
    pub id: String,
    pub change: ChangeRequest,
}

/// Events consumed from the pub/sub collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum InboundEvent {
    /// A subscriber query was created; always answered with a
    /// new-query scheduling request.
    QueryCreated {
        #[serde(flatten)]
        payload: Value,
    },
    /// A service worker announced itself (or refreshed its metrics).
    ServiceWorkerAnnounced { worker: WorkerMetrics },
    /// One monitoring window's view of the whole worker population;
    /// triggers one decision-engine tick.
    ServiceWorkersStreamMonitored {
        service_workers: ServiceWorkersSnapshot,
    },
    /// SLR profile ranking finished upstream; passed through as a
    /// profile-change request.
    #[serde(rename = "ServiceWorkerSLRProfilesRanked")]
    ServiceWorkerSlrProfilesRanked {
        #[serde(flatten)]
        payload: Value,
    },
    /// A scheduling plan was actually deployed; arms the debounce window
    /// for its request type and replaces the current plan.
    SchedulingPlanExecuted { plan: ExecutedPlan },
}

const KNOWN_EVENT_TYPES: [&str; 5] = [
    "QueryCreated",
    "ServiceWorkerAnnounced",
    "ServiceWorkersStreamMonitored",
    "ServiceWorkerSLRProfilesRanked",
    "SchedulingPlanExecuted",
];

/// Parse a raw inbound message.
///
/// Returns `Ok(None)` for event types the analyser does not handle
/// (callers log those as informational and move on) and
/// `Err(MalformedEvent)` when a known event fails to deserialize.
pub fn parse_inbound(value: Value) -> Result<Option<InboundEvent>, AnalyserError> {
    let event_type = value
        .get("event_type")
        .and_then(Value::as_str)
        .ok_or_else(|| AnalyserError::MalformedEvent("missing event_type field".to_string()))?;

    if !KNOWN_EVENT_TYPES.contains(&event_type) {
        return Ok(None);
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| AnalyserError::MalformedEvent(e.to_string()))
}
