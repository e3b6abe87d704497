use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

/// Health check endpoint
///
/// Returns the health status of the server and its data directory.
/// Used by load balancers and monitoring systems.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let storage_status = match tokio::fs::metadata(state.data.root()).await {
        Ok(meta) if meta.is_dir() => "available",
        Ok(_) => {
            tracing::error!("Data path is not a directory: {:?}", state.data.root());
            "unavailable"
        }
        Err(e) => {
            tracing::error!("Data directory health check failed: {:?}", e);
            "unavailable"
        }
    };

    Json(json!({
        "status": if storage_status == "available" { "healthy" } else { "unhealthy" },
        "storage": storage_status,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
