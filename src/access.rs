use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::constants::SYSTEM_IDENTIFIER;
use crate::error::Result;
use crate::models::{minutes_until, ThrottleStatus};
use crate::security::is_access_code;
use crate::store::{calendar_day, DailyKeyStore};
use crate::throttle::AttemptThrottle;

/// Result of checking a presented access code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Code matched today's code
    Granted,
    /// Scheduled check by the system identifier; today's code is in place
    Checked,
    /// Code did not match; `remaining` guesses before a block
    Rejected { remaining: u32 },
    /// Identifier is blocked for roughly `minutes_left` more minutes
    Blocked { minutes_left: i64 },
}

impl VerifyOutcome {
    pub fn success(&self) -> bool {
        matches!(self, VerifyOutcome::Granted | VerifyOutcome::Checked)
    }

    /// User-facing description of the outcome
    pub fn message(&self) -> String {
        match self {
            VerifyOutcome::Granted => "Access code verified".to_string(),
            VerifyOutcome::Checked => "Access code check complete".to_string(),
            VerifyOutcome::Rejected { remaining } => {
                format!("Invalid access code, remaining attempts: {}", remaining)
            }
            VerifyOutcome::Blocked { minutes_left } => format!(
                "Too many failed attempts, access is blocked. Try again in {} minutes.",
                minutes_left
            ),
        }
    }
}

/// Verifies daily access codes against the key store, throttled per identifier
#[derive(Clone)]
pub struct AccessGate {
    keys: Arc<DailyKeyStore>,
    throttle: AttemptThrottle,
}

impl AccessGate {
    pub fn new(keys: Arc<DailyKeyStore>, throttle: AttemptThrottle) -> Self {
        Self { keys, throttle }
    }

    pub fn keys(&self) -> &DailyKeyStore {
        &self.keys
    }

    pub fn throttle(&self) -> &AttemptThrottle {
        &self.throttle
    }

    /// Today's code, rotating it if the day rolled over
    pub async fn current_code(&self) -> Result<String> {
        self.keys.get_or_rotate(calendar_day(Utc::now())).await
    }

    pub async fn verify(&self, code: &str, identifier: &str) -> Result<VerifyOutcome> {
        self.verify_at(code, identifier, Utc::now()).await
    }

    /// Verify `code` for `identifier` as of `now`
    ///
    /// A blocked identifier never reaches the key store, and neither does a
    /// malformed code (it still counts as a failed guess). The system
    /// identifier skips the throttle and only ensures today's code exists.
    pub async fn verify_at(
        &self,
        code: &str,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifyOutcome> {
        let day = calendar_day(now);

        if identifier == SYSTEM_IDENTIFIER {
            self.keys.get_or_rotate(day).await?;
            return Ok(VerifyOutcome::Checked);
        }

        let ts = now.timestamp();
        if let ThrottleStatus::Blocked { until } = self.throttle.check(identifier, ts) {
            tracing::info!("Blocked identifier attempted verification");
            return Ok(VerifyOutcome::Blocked {
                minutes_left: minutes_until(until, ts),
            });
        }

        let code = code.trim();
        let success = if is_access_code(code) {
            code == self.keys.get_or_rotate(day).await?
        } else {
            false
        };

        let outcome = match self.throttle.record(identifier, success, ts) {
            _ if success => VerifyOutcome::Granted,
            ThrottleStatus::Allowed { remaining } => VerifyOutcome::Rejected { remaining },
            ThrottleStatus::Blocked { until } => VerifyOutcome::Blocked {
                minutes_left: minutes_until(until, ts),
            },
        };

        Ok(outcome)
    }
}
