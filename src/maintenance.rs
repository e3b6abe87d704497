use std::time::Duration;

use chrono::{Days, Utc};

use crate::access::AccessGate;
use crate::constants::SYSTEM_IDENTIFIER;
use crate::error::Result;
use crate::store::calendar_day;

/// One maintenance pass: make sure today's code exists, then purge codes
/// older than `retention_days`. Returns the number of purged artifacts.
pub async fn run_key_maintenance(access: &AccessGate, retention_days: i64) -> Result<usize> {
    access.verify("", SYSTEM_IDENTIFIER).await?;

    let today = calendar_day(Utc::now());
    let Some(cutoff) = today.checked_sub_days(Days::new(retention_days.max(1) as u64)) else {
        return Ok(0);
    };

    access.keys().purge_before(cutoff).await
}

/// Run maintenance every `interval` until the task is dropped
pub async fn key_maintenance_loop(access: AccessGate, retention_days: i64, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match run_key_maintenance(&access, retention_days).await {
            Ok(purged) => tracing::debug!("Key maintenance complete, {} purged", purged),
            Err(e) => tracing::error!("Key maintenance failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ThrottlePolicy;
    use crate::store::{DailyKeyStore, DataDir};
    use crate::throttle::AttemptThrottle;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_maintenance_creates_today_and_purges_old() {
        let temp_dir = TempDir::new().unwrap();
        let keys = Arc::new(DailyKeyStore::new(&DataDir::new(temp_dir.path())));
        let access = AccessGate::new(
            keys.clone(),
            AttemptThrottle::new(
                ThrottlePolicy {
                    max_attempts: 5,
                    block_secs: 3600,
                    lookback_secs: 86_400,
                },
                10,
            ),
        );

        let ancient = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        keys.get_or_rotate(ancient).await.unwrap();

        let purged = run_key_maintenance(&access, 30).await.unwrap();

        assert_eq!(purged, 1);
        assert!(!keys.artifact_path(ancient).exists());
        assert!(keys.artifact_path(calendar_day(Utc::now())).exists());
    }
}
