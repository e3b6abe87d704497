pub mod draws;
pub mod files;
pub mod keys;

pub use draws::{DrawStore, HistoricalPrediction, SubmissionReceipt};
pub use files::{DataDir, DirEntryInfo, PathContents};
pub use keys::{calendar_day, parse_day, DailyKeyStore};
