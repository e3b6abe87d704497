/// Length of the daily access code (hex characters of the MD5 digest)
pub const ACCESS_CODE_LEN: usize = 8;

/// Identifier reserved for scheduled key checks; bypasses the throttle
pub const SYSTEM_IDENTIFIER: &str = "auto-check";

/// Failed guesses before an identifier is blocked
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Block window after reaching the failure threshold (1 hour)
pub const DEFAULT_BLOCK_SECS: i64 = 3600;

/// Attempts older than this are forgotten even without a success (24 hours)
pub const DEFAULT_LOOKBACK_SECS: i64 = 86_400;

/// Upper bound on tracked identifiers for access-code guesses
pub const DEFAULT_ACCESS_THROTTLE_CAPACITY: u64 = 10_000;

/// Upper bound on tracked identifiers for admin-key guesses
pub const DEFAULT_ADMIN_THROTTLE_CAPACITY: u64 = 100;

/// Maximum tickets in a single submission
pub const MAX_TICKETS_PER_SUBMISSION: usize = 5;

/// Tickets one client may submit per quota window
pub const DEFAULT_SUBMIT_MAX_TICKETS: u32 = 5;

/// Submission quota window (1 hour)
pub const DEFAULT_SUBMIT_WINDOW_SECS: i64 = 3600;

/// Daily code artifacts older than this many days are purged
pub const DEFAULT_KEY_RETENTION_DAYS: i64 = 30;

/// Interval between scheduled key checks
pub const DEFAULT_KEY_CHECK_INTERVAL_SECS: u64 = 3600;

// =============================================================================
// Data directory layout
// =============================================================================

/// Subdirectory holding one code artifact per calendar day
pub const KEY_DIR: &str = "pin";

/// File holding the draw number submissions are currently filed under
pub const CURRENT_DRAW_FILE: &str = "current_draw.txt";

/// Per-client submission ledger, rewritten wholesale on every update
pub const SUBMISSION_LEDGER_FILE: &str = "ip_records.json";

/// Predictions served when the current draw has none
pub const EXAMPLE_RESULT_FILE: &str = "example_result.txt";

/// Suffix of prediction files: `<draw>_result.txt`
pub const RESULT_SUFFIX: &str = "_result";

// =============================================================================
// Error Messages
// =============================================================================

pub const ERR_EMPTY_TICKETS: &str = "Please enter at least one ticket";

pub const ERR_INVALID_TICKETS: &str =
    "Enter 1-5 valid tickets, one per line: five distinct front numbers 01-35 and two distinct back numbers 01-12, e.g. 0102030405+0607";

pub const ERR_INVALID_DRAW: &str = "Draw number must be digits only";

pub const ERR_INVALID_DAY: &str = "Date must be formatted as YYYY-MM-DD";
