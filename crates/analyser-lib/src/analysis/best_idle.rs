//! Idle-best-worker detection
//!
//! Flags service types where load is being routed away from a champion
//! worker that sits idle while its siblings have pending work.

use serde_json::json;
use tracing::debug;

use super::Detection;
use crate::events::RequestType;
use crate::models::ServiceWorkersSnapshot;
use crate::registry::WorkerRegistry;

#[derive(Debug, Default)]
pub struct IdleBestWorkerDetector;

impl IdleBestWorkerDetector {
    pub fn new() -> Self {
        Self
    }

    /// Scan the monitored population against the champion table.
    ///
    /// A service type where every worker is idle is skipped: with no
    /// pending work anywhere there is nothing to redistribute. Otherwise
    /// each policy champion found in the idle set is reported.
    pub fn check(
        &self,
        snapshot: &ServiceWorkersSnapshot,
        registry: &WorkerRegistry,
    ) -> Option<Detection> {
        let mut findings = Vec::new();

        let mut service_types: Vec<&String> = snapshot.keys().collect();
        service_types.sort();
        for service_type in service_types {
            let group = &snapshot[service_type];
            let idle: Vec<&str> = group
                .workers
                .values()
                .filter(|w| w.is_idle())
                .map(|w| w.stream_key.as_str())
                .collect();

            if idle.is_empty() || idle.len() == group.total_number_workers {
                continue;
            }

            for (policy, best) in registry.best_workers_of(service_type) {
                if idle.contains(&best.stream_key.as_str()) {
                    debug!(
                        service_type = %service_type,
                        policy = %policy,
                        stream_key = %best.stream_key,
                        "best worker is idle while siblings hold work"
                    );
                    findings.push(json!({
                        "service_type": service_type,
                        "policy": policy.to_string(),
                        "stream_key": best.stream_key,
                    }));
                }
            }
        }

        if findings.is_empty() {
            return None;
        }
        Some(Detection {
            request_type: RequestType::ServiceWorkerBestIdle,
            cause: json!({ "idle_best_workers": findings }),
        })
    }
}
