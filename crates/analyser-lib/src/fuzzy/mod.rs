//! Mamdani fuzzy inference for worker usage estimation
//!
//! One model per service type, rebuilt whenever a worker announces a new
//! maximum throughput. `membership` holds the linguistic partitions,
//! `estimator` the rule base and the inference pipeline.

mod estimator;
mod membership;

pub use estimator::{UsageEstimator, UsageModel};
pub use membership::{auto_partition, Label, Triangle};
