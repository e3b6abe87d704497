//! Lottery Predict Server Library
//!
//! This module exports the core types and functions for testing and reuse.

pub mod access;
pub mod config;
pub mod constants;
pub mod error;
pub mod maintenance;
pub mod models;
pub mod routes;
pub mod security;
pub mod store;
pub mod throttle;

pub use access::{AccessGate, VerifyOutcome};
pub use config::Config;
pub use error::{AppError, Result};
pub use store::{DailyKeyStore, DataDir, DrawStore};
pub use throttle::AttemptThrottle;

use std::sync::Arc;

use models::SubmissionQuota;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub data: DataDir,
    pub access: AccessGate,
    pub admin_throttle: AttemptThrottle,
    pub draws: Arc<DrawStore>,
}

impl AppState {
    /// Create the services for the given configuration
    ///
    /// Throttle state starts empty and is never persisted.
    pub fn new(config: Config) -> Self {
        let data = DataDir::new(config.data_dir.clone());

        let keys = Arc::new(DailyKeyStore::new(&data));
        let access = AccessGate::new(
            keys,
            AttemptThrottle::new(config.access_policy(), config.access_throttle_capacity),
        );
        let admin_throttle =
            AttemptThrottle::new(config.admin_policy(), config.admin_throttle_capacity);

        let draws = Arc::new(DrawStore::new(
            data.clone(),
            SubmissionQuota {
                max_tickets: config.submit_max_tickets,
                window_secs: config.submit_window_secs,
            },
        ));

        Self {
            config,
            data,
            access,
            admin_throttle,
            draws,
        }
    }
}
