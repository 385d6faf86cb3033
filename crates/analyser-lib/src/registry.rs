//! Worker registry and QoS best-worker selection
//!
//! Handles:
//! - Upserting announced worker metrics into per-service-type groups
//! - Maintaining the per-policy champion worker for each service type
//! - Strict-improvement replacement (ties keep the incumbent)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{ServiceTypeGroup, WorkerMetrics};

/// Fixed optimization objectives the scheduler can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QosPolicy {
    /// Minimize energy consumption.
    EnergyConsumption,
    /// Minimize latency. No latency attribute is reported, so throughput
    /// stands in for it: higher throughput means faster drain.
    Latency,
    /// Maximize accuracy.
    Accuracy,
}

impl QosPolicy {
    pub const ALL: [QosPolicy; 3] = [
        QosPolicy::EnergyConsumption,
        QosPolicy::Latency,
        QosPolicy::Accuracy,
    ];

    /// The worker attribute this policy compares on, if the worker
    /// reports it.
    pub fn attribute(&self, worker: &WorkerMetrics) -> Option<f64> {
        match self {
            QosPolicy::EnergyConsumption => worker.energy_consumption,
            QosPolicy::Latency => Some(worker.throughput),
            QosPolicy::Accuracy => worker.accuracy,
        }
    }

    /// Whether `candidate` is strictly better than `incumbent`.
    pub fn better(&self, candidate: f64, incumbent: f64) -> bool {
        match self {
            QosPolicy::EnergyConsumption => candidate < incumbent,
            QosPolicy::Latency => candidate > incumbent,
            QosPolicy::Accuracy => candidate > incumbent,
        }
    }
}

impl std::fmt::Display for QosPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QosPolicy::EnergyConsumption => write!(f, "energy_consumption"),
            QosPolicy::Latency => write!(f, "latency"),
            QosPolicy::Accuracy => write!(f, "accuracy"),
        }
    }
}

/// Registry of every worker that has ever announced itself, plus the
/// current per-policy champions.
///
/// Workers are never removed; a slowly-changing pool is assumed and the
/// announce path only ever refreshes or adds entries.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    /// Service type -> group of workers keyed by stream key.
    groups: HashMap<String, ServiceTypeGroup>,
    /// (policy, service type) -> current champion.
    best: HashMap<(QosPolicy, String), WorkerMetrics>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert an announced worker and refresh the champion table for its
    /// service type. Always succeeds.
    pub fn announce(&mut self, worker: WorkerMetrics) {
        let group = self.groups.entry(worker.service_type.clone()).or_default();
        group
            .workers
            .insert(worker.stream_key.clone(), worker.clone());
        group.total_number_workers = group.workers.len();

        for policy in QosPolicy::ALL {
            self.offer(policy, &worker);
        }
    }

    /// Offer a candidate for one policy's champion slot.
    ///
    /// A worker missing the policy's attribute is skipped. The incumbent
    /// is replaced only on strict improvement, so equal-valued candidates
    /// leave the earlier-registered champion in place. A re-announcement
    /// by the champion itself refreshes the stored metrics without
    /// contest.
    fn offer(&mut self, policy: QosPolicy, candidate: &WorkerMetrics) {
        let Some(value) = policy.attribute(candidate) else {
            return;
        };

        let key = (policy, candidate.service_type.clone());
        match self.best.get(&key) {
            None => {
                self.best.insert(key, candidate.clone());
            }
            Some(incumbent) if incumbent.stream_key == candidate.stream_key => {
                self.best.insert(key, candidate.clone());
            }
            Some(incumbent) => {
                let held = policy.attribute(incumbent).unwrap_or(value);
                if policy.better(value, held) {
                    self.best.insert(key, candidate.clone());
                }
            }
        }
    }

    pub fn group(&self, service_type: &str) -> Option<&ServiceTypeGroup> {
        self.groups.get(service_type)
    }

    pub fn groups(&self) -> &HashMap<String, ServiceTypeGroup> {
        &self.groups
    }

    pub fn worker_count(&self) -> usize {
        self.groups.values().map(|g| g.workers.len()).sum()
    }

    /// Current champion for one (policy, service type) pair.
    pub fn best_worker(&self, policy: QosPolicy, service_type: &str) -> Option<&WorkerMetrics> {
        self.best.get(&(policy, service_type.to_string()))
    }

    /// All champions for a service type, one per policy that has one.
    pub fn best_workers_of<'a>(
        &'a self,
        service_type: &'a str,
    ) -> impl Iterator<Item = (QosPolicy, &'a WorkerMetrics)> + 'a {
        QosPolicy::ALL.into_iter().filter_map(move |policy| {
            self.best
                .get(&(policy, service_type.to_string()))
                .map(|w| (policy, w))
        })
    }
}
