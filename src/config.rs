use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::*;
use crate::models::ThrottlePolicy;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub data_dir: PathBuf,
    pub allowed_origins: Vec<String>,
    pub environment: String,
    pub admin_key: String,
    pub access_max_attempts: u32,
    pub access_block_secs: i64,
    pub access_lookback_secs: i64,
    pub access_throttle_capacity: u64,
    pub admin_max_attempts: u32,
    pub admin_block_secs: i64,
    pub admin_throttle_capacity: u64,
    pub submit_max_tickets: u32,
    pub submit_window_secs: i64,
    pub key_retention_days: i64,
    pub key_check_interval_secs: u64,
    pub log_requests: bool,
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, String> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| format!("Invalid {}", key)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = parse_var("SERVER_PORT", 8080)?;

        let data_dir = PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()));

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let admin_key = env::var("ADMIN_KEY")
            .map_err(|_| "ADMIN_KEY must be set to enable the admin panel")?;
        if admin_key.trim().is_empty() {
            return Err("ADMIN_KEY must not be empty".to_string());
        }

        Ok(Config {
            server_host,
            server_port,
            data_dir,
            allowed_origins,
            environment,
            admin_key,
            access_max_attempts: parse_var("ACCESS_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
            access_block_secs: parse_var("ACCESS_BLOCK_SECS", DEFAULT_BLOCK_SECS)?,
            access_lookback_secs: parse_var("ACCESS_LOOKBACK_SECS", DEFAULT_LOOKBACK_SECS)?,
            access_throttle_capacity: parse_var(
                "ACCESS_THROTTLE_CAPACITY",
                DEFAULT_ACCESS_THROTTLE_CAPACITY,
            )?,
            admin_max_attempts: parse_var("ADMIN_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
            admin_block_secs: parse_var("ADMIN_BLOCK_SECS", DEFAULT_BLOCK_SECS)?,
            admin_throttle_capacity: parse_var(
                "ADMIN_THROTTLE_CAPACITY",
                DEFAULT_ADMIN_THROTTLE_CAPACITY,
            )?,
            submit_max_tickets: parse_var("SUBMIT_MAX_TICKETS", DEFAULT_SUBMIT_MAX_TICKETS)?,
            submit_window_secs: parse_var("SUBMIT_WINDOW_SECS", DEFAULT_SUBMIT_WINDOW_SECS)?,
            key_retention_days: parse_var("KEY_RETENTION_DAYS", DEFAULT_KEY_RETENTION_DAYS)?,
            key_check_interval_secs: parse_var(
                "KEY_CHECK_INTERVAL_SECS",
                DEFAULT_KEY_CHECK_INTERVAL_SECS,
            )?,
            log_requests: parse_var("LOG_REQUESTS", true)?,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Throttle policy for daily access-code guesses
    pub fn access_policy(&self) -> ThrottlePolicy {
        ThrottlePolicy {
            max_attempts: self.access_max_attempts,
            block_secs: self.access_block_secs,
            lookback_secs: self.access_lookback_secs,
        }
    }

    /// Throttle policy for admin-key guesses
    ///
    /// Admin records share the access lookback so idle entries age out the same way.
    pub fn admin_policy(&self) -> ThrottlePolicy {
        ThrottlePolicy {
            max_attempts: self.admin_max_attempts,
            block_secs: self.admin_block_secs,
            lookback_secs: self.access_lookback_secs,
        }
    }
}
