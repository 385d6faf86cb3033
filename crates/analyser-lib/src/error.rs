//! Error types for the decision core

use thiserror::Error;

/// Errors surfaced while processing a single inbound event.
///
/// All variants are local to the event being processed; registry and
/// best-worker state for other service types stays valid across them.
#[derive(Debug, Error)]
pub enum AnalyserError {
    /// The aggregated output fuzzy set carried no mass anywhere in the
    /// usage universe. With a partition-of-unity rule base this cannot
    /// happen at runtime, so it indicates a rule-base defect and carries
    /// full inference diagnostics rather than a silent default.
    #[error(
        "fuzzy usage inference produced an empty aggregate for service type \
         '{service_type}' (queue_size={queue_size}, max_capacity={max_capacity}): {diagnostics}"
    )]
    EmptyUsageAggregate {
        service_type: String,
        queue_size: u64,
        max_capacity: u64,
        diagnostics: String,
    },

    /// An inbound event was structurally invalid.
    #[error("malformed event payload: {0}")]
    MalformedEvent(String),

    /// A cause payload could not be serialized into the outbound envelope.
    #[error("change request cause serialization failed: {0}")]
    CauseSerialization(#[from] serde_json::Error),
}
