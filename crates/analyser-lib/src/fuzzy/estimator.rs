//! Usage inference over queue size and capacity
//!
//! Handles:
//! - One Mamdani model per service type, rebuilt when the observed
//!   maximum throughput grows
//! - The 21-rule base mapping (queue_size, max_capacity) to usage
//! - Centroid defuzzification over the discrete usage universe 0..=100

use std::collections::HashMap;

use tracing::debug;

use super::membership::{auto_partition, fuzzify, Label, Triangle};
use crate::error::AnalyserError;
use crate::models::WorkerMetrics;

/// Consequents for the capacity-dependent rows of the rule base.
///
/// Rows are queue_size labels `low..=very_high`; columns are
/// max_capacity labels `very_low..=very_high`. The `very_low` queue row
/// is capacity-independent (usage is `very_low` whatever the capacity)
/// and handled separately.
const RULE_TABLE: [[Label; 5]; 4] = [
    // queue low
    [Label::High, Label::Medium, Label::Low, Label::Low, Label::VeryLow],
    // queue medium
    [Label::VeryHigh, Label::High, Label::High, Label::Medium, Label::Low],
    // queue high
    [Label::VeryHigh, Label::VeryHigh, Label::VeryHigh, Label::High, Label::Medium],
    // queue very_high
    [Label::VeryHigh, Label::VeryHigh, Label::VeryHigh, Label::VeryHigh, Label::High],
];

/// Discretized output universe bound (usage is a percentage).
const USAGE_UNIVERSE_MAX: u64 = 100;

/// One service type's inference model.
///
/// Both inputs share the same partition of `[0, max_capacity]`; the
/// output is partitioned over `[0, 100]`.
#[derive(Debug, Clone)]
pub struct UsageModel {
    max_capacity: u64,
    input_partition: [Triangle; 5],
    output_partition: [Triangle; 5],
}

impl UsageModel {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            max_capacity,
            input_partition: auto_partition(max_capacity as f64),
            output_partition: auto_partition(USAGE_UNIVERSE_MAX as f64),
        }
    }

    pub fn max_capacity(&self) -> u64 {
        self.max_capacity
    }

    /// Fuzzified inputs after saturation to the universe bound.
    fn input_degrees(&self, queue_size: u64, capacity: u64) -> ([f64; 5], [f64; 5]) {
        let queue = queue_size.min(self.max_capacity) as f64;
        let cap = capacity.min(self.max_capacity) as f64;
        (
            fuzzify(&self.input_partition, queue),
            fuzzify(&self.input_partition, cap),
        )
    }

    /// Aggregated firing strength per output label.
    fn firing_strengths(queue_degrees: &[f64; 5], cap_degrees: &[f64; 5]) -> [f64; 5] {
        let mut strength = [0.0f64; 5];
        // Rule 1: very_low queue implies very_low usage regardless of
        // capacity, so its firing strength is the bare queue degree.
        strength[Label::VeryLow.index()] = queue_degrees[Label::VeryLow.index()];
        for (row, consequents) in RULE_TABLE.iter().enumerate() {
            let queue_degree = queue_degrees[row + 1];
            for (col, label) in consequents.iter().enumerate() {
                let fired = queue_degree.min(cap_degrees[col]);
                let slot = &mut strength[label.index()];
                if fired > *slot {
                    *slot = fired;
                }
            }
        }
        strength
    }

    /// Run the full inference pipeline. Inputs above the universe are
    /// saturated to `max_capacity`, not rejected.
    ///
    /// Returns `None` when the aggregated output set carries no mass,
    /// which the partition-of-unity construction rules out; callers
    /// treat it as a modeling defect.
    pub fn evaluate(&self, queue_size: u64, capacity: u64) -> Option<f64> {
        let (queue_degrees, cap_degrees) = self.input_degrees(queue_size, capacity);
        let strength = Self::firing_strengths(&queue_degrees, &cap_degrees);

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for x in 0..=USAGE_UNIVERSE_MAX {
            let xf = x as f64;
            let mut mu = 0.0f64;
            for label in Label::ALL {
                let clipped =
                    strength[label.index()].min(self.output_partition[label.index()].degree(xf));
                if clipped > mu {
                    mu = clipped;
                }
            }
            numerator += xf * mu;
            denominator += mu;
        }

        if denominator == 0.0 {
            None
        } else {
            Some(numerator / denominator)
        }
    }

    /// Full inference trace for one input pair: the fuzzified input
    /// memberships and the aggregated rule strengths per output label.
    pub fn diagnostics(&self, queue_size: u64, capacity: u64) -> String {
        let (queue_degrees, cap_degrees) = self.input_degrees(queue_size, capacity);
        let strength = Self::firing_strengths(&queue_degrees, &cap_degrees);
        format!(
            "universe [0, {}]; queue memberships [{}]; capacity memberships [{}]; rule strengths [{}]",
            self.max_capacity,
            label_degrees(&queue_degrees),
            label_degrees(&cap_degrees),
            label_degrees(&strength),
        )
    }
}

fn label_degrees(values: &[f64; 5]) -> String {
    Label::ALL
        .iter()
        .map(|label| format!("{}={:.3}", label, values[label.index()]))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Per-service-type usage estimation with automatic model growth.
#[derive(Debug)]
pub struct UsageEstimator {
    adaptation_delta: u32,
    models: HashMap<String, UsageModel>,
    max_throughput: HashMap<String, f64>,
    rebuilds: u64,
}

impl UsageEstimator {
    pub fn new(adaptation_delta: u32) -> Self {
        Self {
            adaptation_delta,
            models: HashMap::new(),
            max_throughput: HashMap::new(),
            rebuilds: 0,
        }
    }

    /// Track a worker's throughput; rebuild the service type's model when
    /// it strictly exceeds the recorded maximum. The universe only ever
    /// grows.
    pub fn observe(&mut self, worker: &WorkerMetrics) {
        let recorded = self.max_throughput.get(&worker.service_type).copied();
        if recorded.is_some_and(|max| worker.throughput <= max) {
            return;
        }

        let max_capacity = worker.capacity(self.adaptation_delta);
        debug!(
            service_type = %worker.service_type,
            throughput = worker.throughput,
            max_capacity,
            "rebuilding usage model for new maximum throughput"
        );
        self.max_throughput
            .insert(worker.service_type.clone(), worker.throughput);
        self.models
            .insert(worker.service_type.clone(), UsageModel::new(max_capacity));
        self.rebuilds += 1;
    }

    /// Number of model builds so far, first constructions included.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    pub fn model(&self, service_type: &str) -> Option<&UsageModel> {
        self.models.get(service_type)
    }

    /// Estimated usage percentage for one worker, in `[0, 100]`.
    ///
    /// Observes the worker first so the model exists and covers its
    /// throughput before evaluation.
    pub fn calculate(&mut self, worker: &WorkerMetrics) -> Result<f64, AnalyserError> {
        self.observe(worker);
        let capacity = worker.capacity(self.adaptation_delta);
        // observe() guarantees a model for this service type.
        let model = &self.models[&worker.service_type];
        model
            .evaluate(worker.queue_size, capacity)
            .ok_or_else(|| AnalyserError::EmptyUsageAggregate {
                service_type: worker.service_type.clone(),
                queue_size: worker.queue_size,
                max_capacity: model.max_capacity(),
                diagnostics: format!(
                    "no rule fired for queue_size={} capacity={}: {}",
                    worker.queue_size,
                    capacity,
                    model.diagnostics(worker.queue_size, capacity)
                ),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(queue_size: u64, throughput: f64) -> WorkerMetrics {
        WorkerMetrics {
            stream_key: "worker-data".to_string(),
            service_type: "object-detection".to_string(),
            queue_size,
            throughput,
            energy_consumption: None,
            accuracy: None,
        }
    }

    fn usage(queue_size: u64, max_capacity: u64) -> f64 {
        UsageModel::new(max_capacity)
            .evaluate(queue_size, max_capacity)
            .unwrap()
    }

    #[test]
    fn test_idle_queue_reads_near_zero_usage() {
        let value = usage(1, 100);
        assert!((value - 8.02).abs() < 0.1, "usage was {value}");
    }

    #[test]
    fn test_small_queue_stays_low() {
        let value = usage(15, 100);
        assert!((value - 9.02).abs() < 0.1, "usage was {value}");
        assert!(value < 70.0);
    }

    #[test]
    fn test_mid_queue_reads_moderate_usage() {
        let value = usage(65, 100);
        assert!((30.0..=50.0).contains(&value), "usage was {value}");
    }

    #[test]
    fn test_saturated_queue_reads_overloaded() {
        let value = usage(190, 100);
        assert!((value - 75.0).abs() < 1e-6, "usage was {value}");
        assert!((70.0..=90.0).contains(&value));
    }

    #[test]
    fn test_queue_above_universe_is_clamped() {
        let model = UsageModel::new(100);
        let at_max = model.evaluate(100, 100).unwrap();
        let above_max = model.evaluate(10_000, 100).unwrap();
        assert!((at_max - above_max).abs() < 1e-9);
    }

    #[test]
    fn test_usage_grows_with_queue_size() {
        let model = UsageModel::new(100);
        let mut previous = model.evaluate(0, 100).unwrap();
        for queue in (5..=200).step_by(5) {
            let value = model.evaluate(queue, 100).unwrap();
            // Plateaus in the rule base produce sub-unit ripple, so only
            // material regressions fail.
            assert!(
                value >= previous - 2.0,
                "usage dropped from {previous} to {value} at queue={queue}"
            );
            previous = previous.max(value);
        }
    }

    #[test]
    fn test_small_capacity_worker_in_large_universe_reads_high() {
        // A worker with capacity 10 and queue 100 evaluated against a
        // model whose universe was set by a capacity-100 sibling.
        let model = UsageModel::new(100);
        let value = model.evaluate(100, 10).unwrap();
        assert!((value - 90.98).abs() < 0.1, "usage was {value}");
    }

    #[test]
    fn test_estimator_builds_model_on_first_observation() {
        let mut estimator = UsageEstimator::new(10);
        assert!(estimator.model("object-detection").is_none());

        estimator.observe(&worker(0, 10.0));
        let model = estimator.model("object-detection").unwrap();
        assert_eq!(model.max_capacity(), 100);
    }

    #[test]
    fn test_estimator_universe_never_shrinks() {
        let mut estimator = UsageEstimator::new(10);
        estimator.observe(&worker(0, 10.0));
        estimator.observe(&worker(0, 3.0));
        assert_eq!(
            estimator.model("object-detection").unwrap().max_capacity(),
            100
        );

        estimator.observe(&worker(0, 25.0));
        assert_eq!(
            estimator.model("object-detection").unwrap().max_capacity(),
            250
        );
    }

    #[test]
    fn test_equal_throughput_does_not_rebuild() {
        let mut estimator = UsageEstimator::new(10);
        estimator.observe(&worker(0, 10.0));
        let before = estimator.model("object-detection").unwrap().max_capacity();
        estimator.observe(&worker(0, 10.0));
        assert_eq!(
            estimator.model("object-detection").unwrap().max_capacity(),
            before
        );
    }

    #[test]
    fn test_calculate_covers_unseen_workers() {
        let mut estimator = UsageEstimator::new(10);
        let value = estimator.calculate(&worker(190, 10.0)).unwrap();
        assert!((value - 75.0).abs() < 1e-6, "usage was {value}");
    }

    #[test]
    fn test_rebuild_count_tracks_model_growth() {
        let mut estimator = UsageEstimator::new(10);
        assert_eq!(estimator.rebuilds(), 0);

        estimator.observe(&worker(0, 10.0));
        assert_eq!(estimator.rebuilds(), 1);

        // Neither a lower nor an equal throughput rebuilds.
        estimator.observe(&worker(0, 3.0));
        estimator.observe(&worker(0, 10.0));
        assert_eq!(estimator.rebuilds(), 1);

        estimator.observe(&worker(0, 25.0));
        assert_eq!(estimator.rebuilds(), 2);
    }

    #[test]
    fn test_diagnostics_report_memberships_and_strengths() {
        let model = UsageModel::new(100);
        let trace = model.diagnostics(190, 100);

        assert!(trace.contains("universe [0, 100]"), "trace was {trace}");
        // Queue 190 saturates to 100, which is fully very_high.
        assert!(trace.contains("queue memberships"), "trace was {trace}");
        assert!(trace.contains("very_high=1.000"), "trace was {trace}");
        assert!(trace.contains("capacity memberships"), "trace was {trace}");
        assert!(trace.contains("rule strengths"), "trace was {trace}");
    }

    #[test]
    fn test_models_are_per_service_type() {
        let mut estimator = UsageEstimator::new(10);
        estimator.observe(&worker(0, 10.0));

        let mut tracker = worker(0, 50.0);
        tracker.service_type = "object-tracking".to_string();
        estimator.observe(&tracker);

        assert_eq!(
            estimator.model("object-detection").unwrap().max_capacity(),
            100
        );
        assert_eq!(
            estimator.model("object-tracking").unwrap().max_capacity(),
            500
        );
    }
}
