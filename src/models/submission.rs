use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Per-client submission counter, persisted in the submission ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    /// Tickets submitted within the current window
    pub count: u32,
    /// Unix timestamp of the last accepted submission
    pub last_submit: i64,
}

/// Ledger of submission records keyed by client identifier
pub type SubmissionLedger = HashMap<String, SubmissionRecord>;

/// Quota on tickets per client within a rolling window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionQuota {
    pub max_tickets: u32,
    pub window_secs: i64,
}

impl SubmissionQuota {
    /// Drop records whose last submission fell out of the window
    pub fn prune(&self, ledger: &mut SubmissionLedger, now: i64) {
        let cutoff = now - self.window_secs;
        ledger.retain(|_, record| record.last_submit >= cutoff);
    }

    /// Check the quota for `tickets` more and update the ledger if allowed
    pub fn check_and_increment(
        &self,
        ledger: &mut SubmissionLedger,
        identifier: &str,
        tickets: u32,
        now: i64,
    ) -> Result<SubmissionRecord> {
        self.prune(ledger, now);

        let current = ledger.get(identifier).map(|r| r.count).unwrap_or(0);
        if current + tickets > self.max_tickets {
            tracing::warn!(
                "Submission quota would be exceeded: {}+{}/{}",
                current,
                tickets,
                self.max_tickets
            );
            return Err(AppError::SubmissionQuotaExceeded);
        }

        let record = SubmissionRecord {
            count: current + tickets,
            last_submit: now,
        };
        ledger.insert(identifier.to_string(), record);

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTA: SubmissionQuota = SubmissionQuota {
        max_tickets: 5,
        window_secs: 3600,
    };

    #[test]
    fn test_first_submission_creates_record() {
        let mut ledger = SubmissionLedger::new();
        let record = QUOTA
            .check_and_increment(&mut ledger, "1.2.3.4", 3, 1000)
            .unwrap();

        assert_eq!(record.count, 3);
        assert_eq!(ledger["1.2.3.4"].last_submit, 1000);
    }

    #[test]
    fn test_quota_rejects_overflow() {
        let mut ledger = SubmissionLedger::new();
        QUOTA
            .check_and_increment(&mut ledger, "1.2.3.4", 4, 1000)
            .unwrap();

        assert!(matches!(
            QUOTA.check_and_increment(&mut ledger, "1.2.3.4", 2, 1001),
            Err(AppError::SubmissionQuotaExceeded)
        ));

        // Exactly filling the quota is fine
        assert!(QUOTA
            .check_and_increment(&mut ledger, "1.2.3.4", 1, 1002)
            .is_ok());
    }

    #[test]
    fn test_quota_is_per_identifier() {
        let mut ledger = SubmissionLedger::new();
        QUOTA
            .check_and_increment(&mut ledger, "1.2.3.4", 5, 1000)
            .unwrap();

        assert!(QUOTA
            .check_and_increment(&mut ledger, "5.6.7.8", 5, 1000)
            .is_ok());
    }

    #[test]
    fn test_window_expiry_prunes_records() {
        let mut ledger = SubmissionLedger::new();
        QUOTA
            .check_and_increment(&mut ledger, "1.2.3.4", 5, 1000)
            .unwrap();

        let later = 1000 + 3601;
        let record = QUOTA
            .check_and_increment(&mut ledger, "1.2.3.4", 2, later)
            .unwrap();
        assert_eq!(record.count, 2);
    }

    #[test]
    fn test_ledger_json_shape() {
        let mut ledger = SubmissionLedger::new();
        ledger.insert(
            "1.2.3.4".to_string(),
            SubmissionRecord {
                count: 2,
                last_submit: 1733788800,
            },
        );

        let json = serde_json::to_value(&ledger).unwrap();
        assert_eq!(json["1.2.3.4"]["count"], 2);
        assert_eq!(json["1.2.3.4"]["lastSubmit"], 1733788800);
    }
}
