//! Load-shedding verification
//!
//! Checks whether an active load-shedding strategy is still justified:
//! if a shedding dataflow exists whose path touches no overloaded
//! worker, the system is dropping data it could route cleanly instead.

use std::collections::HashSet;

use serde_json::json;
use tracing::debug;

use super::Detection;
use crate::events::RequestType;
use crate::models::ExecutionPlan;

/// Strategy-name marker for plans that shed load.
const LOAD_SHEDDING_MARKER: &str = "load_shedding";

#[derive(Debug, Default)]
pub struct LoadSheddingVerifier;

impl LoadSheddingVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Verify the current plan against the overloaded worker set.
    ///
    /// Inapplicable (no request) when the strategy does not shed load.
    /// With no overloaded workers at all, shedding is unconditionally
    /// unnecessary. Otherwise a single shedding dataflow routing around
    /// every overloaded worker is enough to flag the plan.
    pub fn check(
        &self,
        current_plan: Option<&ExecutionPlan>,
        overloaded: &HashSet<String>,
    ) -> Option<Detection> {
        let plan = current_plan?;
        if !plan.strategy.name.contains(LOAD_SHEDDING_MARKER) {
            return None;
        }

        if overloaded.is_empty() {
            return Some(Detection {
                request_type: RequestType::UnnecessaryLoadShedding,
                cause: json!({
                    "strategy": plan.strategy.name,
                    "reason": "no worker is overloaded",
                }),
            });
        }

        for dataflow in plan.strategy.dataflows.iter().filter(|d| d.sheds_load()) {
            let clean = dataflow
                .worker_keys()
                .all(|key| !overloaded.contains(key));
            if clean {
                debug!(
                    strategy = %plan.strategy.name,
                    "found a shedding dataflow that avoids every overloaded worker"
                );
                return Some(Detection {
                    request_type: RequestType::UnnecessaryLoadShedding,
                    cause: json!({
                        "strategy": plan.strategy.name,
                        "clean_dataflow": dataflow.path,
                    }),
                });
            }
        }
        None
    }
}
