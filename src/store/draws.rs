use std::io::ErrorKind;
use std::path::PathBuf;

use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::constants::{
    CURRENT_DRAW_FILE, ERR_INVALID_DRAW, EXAMPLE_RESULT_FILE, RESULT_SUFFIX,
    SUBMISSION_LEDGER_FILE,
};
use crate::error::{AppError, Result};
use crate::models::{SubmissionLedger, SubmissionQuota, Ticket};
use crate::store::files::{content_lines, read_optional, write_atomic, DataDir};

/// Validate a draw number (digits only)
pub fn validate_draw(draw: &str) -> bool {
    !draw.is_empty() && draw.len() <= 16 && draw.chars().all(|c| c.is_ascii_digit())
}

/// Predictions recorded for a past or current draw
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPrediction {
    pub draw_number: String,
    pub predicted_numbers: Vec<String>,
}

/// Result of an accepted submission
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub draw_number: String,
    pub accepted: usize,
}

/// Flat-file storage for draws: submissions, predictions and the current draw
#[derive(Debug)]
pub struct DrawStore {
    data: DataDir,
    quota: SubmissionQuota,
    // Guards the ledger read-modify-write and the submission append
    ledger_lock: Mutex<()>,
}

impl DrawStore {
    pub fn new(data: DataDir, quota: SubmissionQuota) -> Self {
        Self {
            data,
            quota,
            ledger_lock: Mutex::new(()),
        }
    }

    fn file(&self, name: &str) -> PathBuf {
        self.data.root().join(name)
    }

    fn submissions_path(&self, draw: &str) -> PathBuf {
        self.file(&format!("{}.txt", draw))
    }

    fn predictions_path(&self, draw: &str) -> PathBuf {
        self.file(&format!("{}{}.txt", draw, RESULT_SUFFIX))
    }

    /// Draw number submissions are filed under, if set
    pub async fn current_draw(&self) -> Result<Option<String>> {
        let raw = read_optional(&self.file(CURRENT_DRAW_FILE)).await?;
        Ok(raw
            .map(|s| s.trim().to_string())
            .filter(|s| validate_draw(s)))
    }

    /// Current draw, or `DrawUnavailable` if the admin has not set one
    pub async fn require_current_draw(&self) -> Result<String> {
        self.current_draw().await?.ok_or_else(|| {
            tracing::warn!("Current draw number requested but not set");
            AppError::DrawUnavailable
        })
    }

    pub async fn set_current_draw(&self, draw: &str) -> Result<()> {
        let draw = draw.trim();
        if !validate_draw(draw) {
            return Err(AppError::InvalidInput(ERR_INVALID_DRAW.to_string()));
        }

        write_atomic(&self.file(CURRENT_DRAW_FILE), draw.as_bytes()).await?;
        tracing::info!("Current draw set to {}", draw);
        Ok(())
    }

    async fn load_ledger(&self) -> Result<SubmissionLedger> {
        let path = self.file(SUBMISSION_LEDGER_FILE);
        let Some(raw) = read_optional(&path).await? else {
            return Ok(SubmissionLedger::new());
        };

        match serde_json::from_str(&raw) {
            Ok(ledger) => Ok(ledger),
            Err(e) => {
                tracing::error!("Submission ledger is corrupt, starting fresh: {}", e);
                Ok(SubmissionLedger::new())
            }
        }
    }

    /// Append tickets for the current draw, charging them to `identifier`
    pub async fn submit(
        &self,
        tickets: &[Ticket],
        identifier: &str,
        now: i64,
    ) -> Result<SubmissionReceipt> {
        let draw = self.require_current_draw().await?;

        let _guard = self.ledger_lock.lock().await;
        let mut ledger = self.load_ledger().await?;
        let record =
            self.quota
                .check_and_increment(&mut ledger, identifier, tickets.len() as u32, now)?;
        tracing::debug!(
            "Submission quota used: {}/{}",
            record.count,
            self.quota.max_tickets
        );

        let mut lines = String::new();
        for ticket in tickets {
            lines.push_str(&ticket.to_string());
            lines.push('\n');
        }

        self.data.ensure().await?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.submissions_path(&draw))
            .await?;
        file.write_all(lines.as_bytes()).await?;
        file.flush().await?;

        // The tickets are already stored; a ledger failure only loosens the quota
        match serde_json::to_vec(&ledger) {
            Ok(bytes) => {
                if let Err(e) = write_atomic(&self.file(SUBMISSION_LEDGER_FILE), &bytes).await {
                    tracing::error!("Failed to save submission ledger: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to encode submission ledger: {}", e),
        }

        Ok(SubmissionReceipt {
            draw_number: draw,
            accepted: tickets.len(),
        })
    }

    /// Number of tickets submitted for `draw`
    pub async fn ticket_count(&self, draw: &str) -> Result<usize> {
        let content = read_optional(&self.submissions_path(draw)).await?;
        Ok(content.map(|c| content_lines(&c).len()).unwrap_or(0))
    }

    /// Prediction lines for `draw`, falling back to the example file
    pub async fn predictions(&self, draw: Option<&str>) -> Result<Vec<String>> {
        if let Some(draw) = draw {
            if let Some(content) = read_optional(&self.predictions_path(draw)).await? {
                return Ok(content_lines(&content));
            }
        }

        let example = read_optional(&self.file(EXAMPLE_RESULT_FILE)).await?;
        Ok(example.map(|c| content_lines(&c)).unwrap_or_default())
    }

    /// Replace the predictions for `draw`
    pub async fn save_predictions(&self, draw: &str, tickets: &[Ticket]) -> Result<()> {
        if !validate_draw(draw) {
            return Err(AppError::InvalidInput(ERR_INVALID_DRAW.to_string()));
        }

        let mut content = String::new();
        for ticket in tickets {
            content.push_str(&ticket.to_string());
            content.push('\n');
        }

        write_atomic(&self.predictions_path(draw), content.as_bytes()).await?;
        tracing::info!("Saved {} predictions for draw {}", tickets.len(), draw);
        Ok(())
    }

    /// All non-empty prediction files, newest draw first
    pub async fn history(&self) -> Result<Vec<HistoricalPrediction>> {
        let mut entries = match fs::read_dir(self.data.root()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut history = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }

            let name = entry.file_name();
            let Some(draw) = name
                .to_str()
                .and_then(|n| n.strip_suffix(".txt"))
                .and_then(|n| n.strip_suffix(RESULT_SUFFIX))
                .filter(|d| validate_draw(d))
            else {
                continue;
            };

            match fs::read_to_string(entry.path()).await {
                Ok(content) => {
                    let predicted_numbers = content_lines(&content);
                    if !predicted_numbers.is_empty() {
                        history.push(HistoricalPrediction {
                            draw_number: draw.to_string(),
                            predicted_numbers,
                        });
                    }
                }
                Err(e) => tracing::error!("Failed to read predictions for {}: {}", draw, e),
            }
        }

        // Numeric order so that draw 100000 sorts after 99999
        history.sort_by(|a, b| {
            b.draw_number
                .len()
                .cmp(&a.draw_number.len())
                .then_with(|| b.draw_number.cmp(&a.draw_number))
        });

        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(temp_dir: &TempDir) -> DrawStore {
        DrawStore::new(
            DataDir::new(temp_dir.path()),
            SubmissionQuota {
                max_tickets: 5,
                window_secs: 3600,
            },
        )
    }

    fn tickets(lines: &[&str]) -> Vec<Ticket> {
        lines.iter().map(|l| l.parse().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_submit_without_draw_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let draws = store(&temp_dir);

        let result = draws
            .submit(&tickets(&["0102030405+0607"]), "1.2.3.4", 1000)
            .await;
        assert!(matches!(result, Err(AppError::DrawUnavailable)));
    }

    #[tokio::test]
    async fn test_submit_appends_display_form() {
        let temp_dir = TempDir::new().unwrap();
        let draws = store(&temp_dir);
        draws.set_current_draw("25051").await.unwrap();

        let receipt = draws
            .submit(&tickets(&["0102030405+0607", "3534333231+1211"]), "1.2.3.4", 1000)
            .await
            .unwrap();
        assert_eq!(receipt.draw_number, "25051");
        assert_eq!(receipt.accepted, 2);

        draws
            .submit(&tickets(&["0607080910+0102"]), "5.6.7.8", 1001)
            .await
            .unwrap();

        let content = std::fs::read_to_string(temp_dir.path().join("25051.txt")).unwrap();
        assert_eq!(
            content,
            "01 02 03 04 05 + 06 07\n35 34 33 32 31 + 12 11\n06 07 08 09 10 + 01 02\n"
        );
        assert_eq!(draws.ticket_count("25051").await.unwrap(), 3);
        assert_eq!(draws.ticket_count("25052").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_submit_enforces_quota_and_persists_ledger() {
        let temp_dir = TempDir::new().unwrap();
        let draws = store(&temp_dir);
        draws.set_current_draw("25051").await.unwrap();

        let five = vec!["0102030405+0607"; 5];
        draws.submit(&tickets(&five), "1.2.3.4", 1000).await.unwrap();

        let result = draws
            .submit(&tickets(&["0102030405+0607"]), "1.2.3.4", 1100)
            .await;
        assert!(matches!(result, Err(AppError::SubmissionQuotaExceeded)));
        assert_eq!(draws.ticket_count("25051").await.unwrap(), 5);

        let ledger: SubmissionLedger = serde_json::from_str(
            &std::fs::read_to_string(temp_dir.path().join(SUBMISSION_LEDGER_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(ledger["1.2.3.4"].count, 5);
    }

    #[tokio::test]
    async fn test_corrupt_ledger_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let draws = store(&temp_dir);
        draws.set_current_draw("25051").await.unwrap();
        std::fs::write(temp_dir.path().join(SUBMISSION_LEDGER_FILE), "{not json").unwrap();

        assert!(draws
            .submit(&tickets(&["0102030405+0607"]), "1.2.3.4", 1000)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_current_draw_validation() {
        let temp_dir = TempDir::new().unwrap();
        let draws = store(&temp_dir);

        assert!(draws.current_draw().await.unwrap().is_none());
        assert!(matches!(
            draws.set_current_draw("25a51").await,
            Err(AppError::InvalidInput(_))
        ));

        draws.set_current_draw(" 25051 ").await.unwrap();
        assert_eq!(draws.current_draw().await.unwrap().as_deref(), Some("25051"));
    }

    #[tokio::test]
    async fn test_predictions_fall_back_to_example() {
        let temp_dir = TempDir::new().unwrap();
        let draws = store(&temp_dir);

        assert!(draws.predictions(Some("25051")).await.unwrap().is_empty());

        std::fs::write(
            temp_dir.path().join(EXAMPLE_RESULT_FILE),
            "01 03 15 22 28 + 02 12\n",
        )
        .unwrap();
        assert_eq!(
            draws.predictions(Some("25051")).await.unwrap(),
            vec!["01 03 15 22 28 + 02 12"]
        );
        assert_eq!(draws.predictions(None).await.unwrap().len(), 1);

        draws
            .save_predictions("25051", &tickets(&["0610132833+0308"]))
            .await
            .unwrap();
        assert_eq!(
            draws.predictions(Some("25051")).await.unwrap(),
            vec!["06 10 13 28 33 + 03 08"]
        );
    }

    #[tokio::test]
    async fn test_history_lists_prediction_files_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let draws = store(&temp_dir);

        draws
            .save_predictions("25050", &tickets(&["0102030405+0607"]))
            .await
            .unwrap();
        draws
            .save_predictions("25051", &tickets(&["0607080910+0102"]))
            .await
            .unwrap();
        std::fs::write(temp_dir.path().join("25052_result.txt"), "\n").unwrap();
        std::fs::write(temp_dir.path().join("25051.txt"), "01 02 03 04 05 + 06 07\n").unwrap();
        std::fs::write(temp_dir.path().join(EXAMPLE_RESULT_FILE), "x\n").unwrap();

        let history = draws.history().await.unwrap();
        let numbers: Vec<_> = history.iter().map(|h| h.draw_number.as_str()).collect();
        assert_eq!(numbers, vec!["25051", "25050"]);
        assert_eq!(history[0].predicted_numbers, vec!["06 07 08 09 10 + 01 02"]);
    }
}
