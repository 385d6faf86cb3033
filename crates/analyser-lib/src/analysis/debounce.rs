//! Per-request-type debouncing
//!
//! The ledger records when a scheduling plan of each request type was
//! last *executed*, not when a request was last sent. A request that
//! never produced a deployed plan is therefore free to be retried on
//! the next tick.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::events::RequestType;

/// Default minimum interval between same-typed requests (seconds).
pub const DEFAULT_MIN_SECONDS: i64 = 3;

#[derive(Debug)]
pub struct Debouncer {
    min_interval: Duration,
    last_executed: HashMap<RequestType, DateTime<Utc>>,
}

impl Debouncer {
    pub fn new(min_seconds: i64) -> Self {
        Self {
            min_interval: Duration::seconds(min_seconds),
            last_executed: HashMap::new(),
        }
    }

    /// Whether a request of this type may be evaluated at `now`.
    ///
    /// Allowed when no execution of the type is on record, or when the
    /// recorded one is at least the minimum interval in the past.
    pub fn allow(&self, request_type: RequestType, now: DateTime<Utc>) -> bool {
        match self.last_executed.get(&request_type) {
            None => true,
            Some(executed_at) => now - *executed_at >= self.min_interval,
        }
    }

    /// Record that a plan of this type was executed at `timestamp`.
    pub fn record_execution(&mut self, request_type: RequestType, timestamp: DateTime<Utc>) {
        self.last_executed.insert(request_type, timestamp);
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SECONDS)
    }
}
