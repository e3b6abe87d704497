//! In-memory attempt throttle keyed by client identifier.
//!
//! Records live in a bounded cache whose idle expiry covers both the lookback
//! window and the block duration, so an evicted record is indistinguishable
//! from one that would have been reset anyway. Every update is an atomic
//! per-key compute.

use std::time::Duration;

use moka::ops::compute::Op;
use moka::sync::Cache;

use crate::models::{AttemptRecord, ThrottlePolicy, ThrottleStatus};

#[derive(Clone)]
pub struct AttemptThrottle {
    records: Cache<String, AttemptRecord>,
    policy: ThrottlePolicy,
}

/// How long an untouched record must be kept before dropping it is safe
fn idle_expiry(policy: &ThrottlePolicy) -> Duration {
    let secs = policy.lookback_secs.max(policy.block_secs).max(1);
    Duration::from_secs(secs as u64)
}

impl AttemptThrottle {
    pub fn new(policy: ThrottlePolicy, capacity: u64) -> Self {
        let records = Cache::builder()
            .max_capacity(capacity)
            .time_to_idle(idle_expiry(&policy))
            .build();

        Self { records, policy }
    }

    /// Status for `identifier`, applying any lazy resets that are due
    pub fn check(&self, identifier: &str, now: i64) -> ThrottleStatus {
        let policy = self.policy;
        let mut status = ThrottleStatus::Allowed {
            remaining: policy.max_attempts,
        };

        self.records
            .entry(identifier.to_string())
            .and_compute_with(|entry| match entry {
                Some(entry) => {
                    let mut record = entry.into_value();
                    let changed = record.normalize(now, &policy);
                    status = record.status(now, &policy);
                    if changed {
                        Op::Put(record)
                    } else {
                        Op::Nop
                    }
                }
                None => Op::Nop,
            });

        status
    }

    /// Record a guess; success clears the record, failure counts toward a block
    pub fn record(&self, identifier: &str, success: bool, now: i64) -> ThrottleStatus {
        let policy = self.policy;
        let mut status = ThrottleStatus::Allowed {
            remaining: policy.max_attempts,
        };

        self.records
            .entry(identifier.to_string())
            .and_compute_with(|entry| {
                let mut record = entry
                    .map(|e| e.into_value())
                    .unwrap_or_else(|| AttemptRecord::new(now));

                if success {
                    record.register_success(now);
                    status = record.status(now, &policy);
                } else {
                    status = record.register_failure(now, &policy);
                }
                Op::Put(record)
            });

        status
    }

    /// Stored record for `identifier`, without applying resets
    pub fn snapshot(&self, identifier: &str) -> Option<AttemptRecord> {
        self.records.get(identifier)
    }
}
