use serde::{Deserialize, Serialize};

/// Limits applied to failed guesses from a single identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    /// Failures that trigger a block
    pub max_attempts: u32,
    /// Length of a block in seconds
    pub block_secs: i64,
    /// Failures older than this many seconds are forgotten
    pub lookback_secs: i64,
}

/// Outcome of consulting or updating an attempt record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleStatus {
    /// Guesses are allowed; `remaining` failures before a block
    Allowed { remaining: u32 },
    /// Blocked until the given Unix timestamp
    Blocked { until: i64 },
}

impl ThrottleStatus {
    pub fn is_blocked(&self) -> bool {
        matches!(self, ThrottleStatus::Blocked { .. })
    }
}

/// Whole minutes until `until`, rounded up and never below one
pub fn minutes_until(until: i64, now: i64) -> i64 {
    let secs = (until - now).max(1);
    (secs + 59) / 60
}

/// Failed-guess record for one identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Consecutive failures since the last reset
    pub attempts: u32,
    /// Unix timestamp of the last recorded guess
    pub last_attempt_at: i64,
    /// Unix timestamp when an active block ends
    pub blocked_until: Option<i64>,
}

impl AttemptRecord {
    /// Create a clean record
    pub fn new(now: i64) -> Self {
        Self {
            attempts: 0,
            last_attempt_at: now,
            blocked_until: None,
        }
    }

    /// Apply lazy resets: an expired block clears the record, and failures
    /// older than the lookback window are forgotten.
    ///
    /// Returns true if the record changed.
    pub fn normalize(&mut self, now: i64, policy: &ThrottlePolicy) -> bool {
        let before = *self;

        if let Some(until) = self.blocked_until {
            if until <= now {
                self.attempts = 0;
                self.blocked_until = None;
            }
        }

        if self.attempts > 0 && now - self.last_attempt_at >= policy.lookback_secs {
            self.attempts = 0;
        }

        *self != before
    }

    /// Current status without applying resets
    pub fn status(&self, now: i64, policy: &ThrottlePolicy) -> ThrottleStatus {
        match self.blocked_until {
            Some(until) if until > now => ThrottleStatus::Blocked { until },
            _ => ThrottleStatus::Allowed {
                remaining: policy.max_attempts.saturating_sub(self.attempts),
            },
        }
    }

    /// Count a failed guess, blocking once the threshold is reached
    pub fn register_failure(&mut self, now: i64, policy: &ThrottlePolicy) -> ThrottleStatus {
        self.normalize(now, policy);

        if let Some(until) = self.blocked_until {
            return ThrottleStatus::Blocked { until };
        }

        self.attempts += 1;
        self.last_attempt_at = now;

        if self.attempts >= policy.max_attempts {
            let until = now + policy.block_secs;
            self.blocked_until = Some(until);
            tracing::warn!(
                "Failure threshold reached: {}/{}, blocked for {}s",
                self.attempts,
                policy.max_attempts,
                policy.block_secs
            );
            return ThrottleStatus::Blocked { until };
        }

        self.status(now, policy)
    }

    /// Reset after a successful guess
    pub fn register_success(&mut self, now: i64) {
        *self = Self::new(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: ThrottlePolicy = ThrottlePolicy {
        max_attempts: 5,
        block_secs: 3600,
        lookback_secs: 86_400,
    };

    #[test]
    fn test_new_record_is_clean() {
        let now = 1_000_000;
        let record = AttemptRecord::new(now);

        assert_eq!(record.attempts, 0);
        assert!(record.blocked_until.is_none());
        assert_eq!(
            record.status(now, &POLICY),
            ThrottleStatus::Allowed { remaining: 5 }
        );
    }

    #[test]
    fn test_failures_count_down() {
        let now = 1_000_000;
        let mut record = AttemptRecord::new(now);

        assert_eq!(
            record.register_failure(now, &POLICY),
            ThrottleStatus::Allowed { remaining: 4 }
        );
        assert_eq!(
            record.register_failure(now + 1, &POLICY),
            ThrottleStatus::Allowed { remaining: 3 }
        );
        assert_eq!(record.last_attempt_at, now + 1);
    }

    #[test]
    fn test_fifth_failure_blocks_for_an_hour() {
        let now = 1_000_000;
        let mut record = AttemptRecord::new(now);

        for _ in 0..4 {
            assert!(!record.register_failure(now, &POLICY).is_blocked());
        }

        assert_eq!(
            record.register_failure(now, &POLICY),
            ThrottleStatus::Blocked { until: now + 3600 }
        );
    }

    #[test]
    fn test_failure_while_blocked_does_not_extend_block() {
        let now = 1_000_000;
        let mut record = AttemptRecord::new(now);
        for _ in 0..5 {
            record.register_failure(now, &POLICY);
        }

        assert_eq!(
            record.register_failure(now + 600, &POLICY),
            ThrottleStatus::Blocked { until: now + 3600 }
        );
        assert_eq!(record.attempts, 5);
    }

    #[test]
    fn test_block_expires_lazily() {
        let now = 1_000_000;
        let mut record = AttemptRecord::new(now);
        for _ in 0..5 {
            record.register_failure(now, &POLICY);
        }

        let later = now + 3601;
        assert!(record.normalize(later, &POLICY));
        assert_eq!(record.attempts, 0);
        assert!(record.blocked_until.is_none());
        assert_eq!(
            record.status(later, &POLICY),
            ThrottleStatus::Allowed { remaining: 5 }
        );
    }

    #[test]
    fn test_success_resets_immediately() {
        let now = 1_000_000;
        let mut record = AttemptRecord::new(now);
        for _ in 0..3 {
            record.register_failure(now, &POLICY);
        }

        record.register_success(now + 5);

        assert_eq!(
            record.register_failure(now + 6, &POLICY),
            ThrottleStatus::Allowed { remaining: 4 }
        );
    }

    #[test]
    fn test_lookback_forgets_old_failures() {
        let now = 1_000_000;
        let mut record = AttemptRecord::new(now);
        for _ in 0..4 {
            record.register_failure(now, &POLICY);
        }

        // Just inside the window the count survives
        let mut inside = record;
        assert!(!inside.normalize(now + 86_399, &POLICY));
        assert_eq!(inside.attempts, 4);

        assert!(record.normalize(now + 86_400, &POLICY));
        assert_eq!(record.attempts, 0);
    }

    #[test]
    fn test_minutes_until_rounds_up() {
        assert_eq!(minutes_until(3600, 0), 60);
        assert_eq!(minutes_until(3600, 1), 60);
        assert_eq!(minutes_until(61, 0), 2);
        assert_eq!(minutes_until(10, 10), 1);
    }
}
