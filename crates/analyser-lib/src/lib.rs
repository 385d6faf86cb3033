//! Decision core of a self-adaptive stream-processing control loop
//!
//! This crate implements the "Analyse" stage of a MAPE-K loop:
//! - Worker registry and per-QoS-policy best-worker tracking
//! - Fuzzy usage estimation from queue size and capacity
//! - Overload, idle-best-worker and load-shedding analyses
//! - Change-request debouncing and the decision engine orchestrator
//! - Health checks and observability

pub mod analysis;
pub mod engine;
pub mod error;
pub mod events;
pub mod fuzzy;
pub mod health;
pub mod models;
pub mod observability;
pub mod registry;

pub use engine::{AnalyserEngine, EngineSettings};
pub use error::AnalyserError;
pub use events::{parse_inbound, ChangePlanEvent, ChangeRequest, InboundEvent, RequestType};
pub use health::{
    Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{AnalyserMetrics, StructuredLogger};
pub use registry::{QosPolicy, WorkerRegistry};
