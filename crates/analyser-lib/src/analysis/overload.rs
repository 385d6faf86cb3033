//! Overload detection
//!
//! A worker is overloaded when its estimated usage crosses the
//! configured threshold. Usage comes from the fuzzy estimator by
//! default, or from the crisp queue/capacity ratio when fuzzy analysis
//! is disabled.

use serde_json::json;
use tracing::debug;

use super::Detection;
use crate::error::AnalyserError;
use crate::events::RequestType;
use crate::fuzzy::UsageEstimator;
use crate::models::{ServiceWorkersSnapshot, WorkerMetrics};

#[derive(Debug, Clone)]
pub struct OverloadDetector {
    adaptation_delta: u32,
    is_overloaded_percentage: f64,
    use_fuzzy_usage_analysis: bool,
}

impl OverloadDetector {
    pub fn new(
        adaptation_delta: u32,
        is_overloaded_percentage: f64,
        use_fuzzy_usage_analysis: bool,
    ) -> Self {
        Self {
            adaptation_delta,
            is_overloaded_percentage,
            use_fuzzy_usage_analysis,
        }
    }

    /// Whether a single worker is overloaded.
    ///
    /// A worker with zero capacity is saturated by definition; one with
    /// an empty queue never is. Everything in between compares estimated
    /// usage against the threshold.
    pub fn is_worker_overloaded(
        &self,
        worker: &WorkerMetrics,
        estimator: &mut UsageEstimator,
    ) -> Result<bool, AnalyserError> {
        let capacity = worker.capacity(self.adaptation_delta);
        if capacity == 0 {
            return Ok(true);
        }
        if worker.queue_size == 0 {
            return Ok(false);
        }

        let usage = if self.use_fuzzy_usage_analysis {
            estimator.calculate(worker)? / 100.0
        } else {
            worker.queue_size as f64 / capacity as f64
        };
        debug!(
            stream_key = %worker.stream_key,
            service_type = %worker.service_type,
            queue_size = worker.queue_size,
            capacity,
            usage,
            "evaluated worker usage"
        );
        Ok(usage >= self.is_overloaded_percentage)
    }

    /// Scan the monitored population and return the overloaded stream
    /// keys, sorted for stable output.
    pub fn overloaded_workers(
        &self,
        snapshot: &ServiceWorkersSnapshot,
        estimator: &mut UsageEstimator,
    ) -> Result<Vec<String>, AnalyserError> {
        let mut overloaded = Vec::new();
        for group in snapshot.values() {
            for worker in group.workers.values() {
                if self.is_worker_overloaded(worker, estimator)? {
                    overloaded.push(worker.stream_key.clone());
                }
            }
        }
        overloaded.sort();
        Ok(overloaded)
    }

    /// A non-empty overloaded set raises an overload plan request
    /// carrying the affected stream keys.
    pub fn detection_for(&self, overloaded: &[String]) -> Option<Detection> {
        if overloaded.is_empty() {
            return None;
        }
        Some(Detection {
            request_type: RequestType::ServiceWorkerOverloaded,
            cause: json!({ "overloaded_service_workers": overloaded }),
        })
    }

    /// Full tick-level check over the monitored population.
    pub fn check(
        &self,
        snapshot: &ServiceWorkersSnapshot,
        estimator: &mut UsageEstimator,
    ) -> Result<Option<Detection>, AnalyserError> {
        let overloaded = self.overloaded_workers(snapshot, estimator)?;
        Ok(self.detection_for(&overloaded))
    }
}
