use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, Local, NaiveDate, Utc};
use tokio::fs;
use tokio::sync::Mutex;

use crate::constants::KEY_DIR;
use crate::error::Result;
use crate::security::generate_access_code;
use crate::store::files::{write_atomic, DataDir};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Local calendar day of a UTC instant
pub fn calendar_day(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Local).date_naive()
}

/// Parse a `YYYY-MM-DD` day
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DAY_FORMAT).ok()
}

/// One access code per calendar day, persisted as `pin/<YYYY-MM-DD>.txt`
///
/// The artifact holds exactly the code. An artifact whose modification time
/// falls before the start of its day is stale and gets regenerated.
#[derive(Debug)]
pub struct DailyKeyStore {
    dir: PathBuf,
    // Serializes check-then-write so a day rolls over exactly once
    lock: Mutex<()>,
}

impl DailyKeyStore {
    pub fn new(data: &DataDir) -> Self {
        Self {
            dir: data.root().join(KEY_DIR),
            lock: Mutex::new(()),
        }
    }

    /// Path of the artifact for `day`
    pub fn artifact_path(&self, day: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.txt", day.format(DAY_FORMAT)))
    }

    /// Return the code for `day`, generating and persisting one if the
    /// artifact is missing, empty, or stale
    pub async fn get_or_rotate(&self, day: NaiveDate) -> Result<String> {
        let _guard = self.lock.lock().await;
        let path = self.artifact_path(day);

        match fs::metadata(&path).await {
            Ok(meta) => {
                let modified: DateTime<Local> = meta.modified()?.into();
                if modified.date_naive() >= day {
                    let stored = fs::read_to_string(&path).await?;
                    let stored = stored.trim();
                    if !stored.is_empty() {
                        return Ok(stored.to_string());
                    }
                    tracing::warn!("Empty access code artifact for {}, regenerating", day);
                } else {
                    tracing::info!(
                        "Access code artifact for {} was written {}, regenerating",
                        day,
                        modified.date_naive()
                    );
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.write_new(day).await
    }

    /// Unconditionally replace the code for `day`
    pub async fn reset(&self, day: NaiveDate) -> Result<String> {
        let _guard = self.lock.lock().await;
        tracing::info!("Access code for {} reset by admin", day);
        self.write_new(day).await
    }

    async fn write_new(&self, day: NaiveDate) -> Result<String> {
        let code = generate_access_code();
        write_atomic(&self.artifact_path(day), code.as_bytes()).await?;
        tracing::info!("New access code generated for {}", day);
        Ok(code)
    }

    /// Delete artifacts for days strictly before `cutoff`
    ///
    /// Files that are not named after a day are left alone.
    pub async fn purge_before(&self, cutoff: NaiveDate) -> Result<usize> {
        let _guard = self.lock.lock().await;

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(day) = name
                .to_str()
                .and_then(|n| n.strip_suffix(".txt"))
                .and_then(parse_day)
            else {
                continue;
            };

            if day < cutoff {
                fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!("Purged {} expired access codes before {}", removed, cutoff);
        }
        Ok(removed)
    }
}
