//! Worker-population analyses
//!
//! This module provides the checks the decision engine runs on each
//! monitoring tick:
//! - Overload detection (fuzzy or crisp usage against a threshold)
//! - Idle-best-worker detection (champions starved of load)
//! - Load-shedding verification (shedding that routes around no overload)
//! - Debouncing of repeated request types

mod best_idle;
mod debounce;
mod load_shedding;
mod overload;

pub use best_idle::IdleBestWorkerDetector;
pub use debounce::Debouncer;
pub use load_shedding::LoadSheddingVerifier;
pub use overload::OverloadDetector;

use serde_json::Value;

use crate::events::RequestType;

/// A positive analysis result: the request type to raise and the
/// evidence that justifies it.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub request_type: RequestType,
    pub cause: Value,
}
