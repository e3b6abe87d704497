pub mod access;
pub mod admin;
pub mod client;
pub mod health;
pub mod tickets;

use axum::{
    routing::{get, post},
    Router,
};

use crate::security::admin_panel_path;
use crate::AppState;

pub use access::{key_check, verify_code, view_predictions};
pub use admin::{
    admin_login, current_key, modify_data, read_data, save_predictions, set_draw, AdminAuth,
};
pub use client::{client_id, ClientIp};
pub use health::health_check;
pub use tickets::{history, stats, submit_tickets};

/// Build the application router
///
/// Admin routes are nested under `/<md5(admin key)>` and additionally
/// require the `X-Admin-Key` header.
pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/api/auth", post(admin_login))
        .route("/api/key", post(current_key))
        .route("/api/data", get(read_data).post(modify_data))
        .route("/api/draw", post(set_draw))
        .route("/api/predictions", post(save_predictions));

    let admin_prefix = format!("/{}", admin_panel_path(&state.config.admin_key));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/client-id", get(client_id))
        .route("/api/access/verify", post(verify_code))
        .route("/api/predictions", post(view_predictions))
        .route("/api/key-check", get(key_check))
        .route("/api/tickets", post(submit_tickets))
        .route("/api/stats", get(stats))
        .route("/api/history", get(history))
        .nest(&admin_prefix, admin)
        .with_state(state)
}
