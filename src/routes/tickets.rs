use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::constants::{ERR_EMPTY_TICKETS, ERR_INVALID_TICKETS};
use crate::error::{AppError, Result};
use crate::models::parse_tickets;
use crate::routes::client::ClientIp;
use crate::security::client_fingerprint;
use crate::store::HistoricalPrediction;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitTicketsRequest {
    /// One ticket per line
    pub tickets: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTicketsResponse {
    pub success: bool,
    pub message: String,
    pub draw_number: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub draw_number: Option<String>,
    pub total_tickets: usize,
    pub last_updated: String,
}

/// Submit 1-5 tickets for the current draw
///
/// # Anti-Abuse
/// - Every line must be a valid ticket, or nothing is stored
/// - Per-client quota on tickets per hour
pub async fn submit_tickets(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(payload): Json<SubmitTicketsRequest>,
) -> Result<Json<SubmitTicketsResponse>> {
    if payload.tickets.trim().is_empty() {
        return Err(AppError::InvalidInput(ERR_EMPTY_TICKETS.to_string()));
    }

    let tickets = parse_tickets(&payload.tickets).map_err(|e| {
        tracing::debug!("Rejected ticket submission: {}", e);
        AppError::InvalidInput(ERR_INVALID_TICKETS.to_string())
    })?;

    let receipt = state
        .draws
        .submit(&tickets, &ip, Utc::now().timestamp())
        .await?;

    tracing::info!(
        "{} tickets submitted for draw {} by {}",
        receipt.accepted,
        receipt.draw_number,
        client_fingerprint(&ip, &state.config.admin_key)
    );

    Ok(Json(SubmitTicketsResponse {
        success: true,
        message: format!("Successfully submitted {} tickets", receipt.accepted),
        draw_number: receipt.draw_number,
    }))
}

/// Current draw and number of tickets submitted for it
///
/// GET /api/stats
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let draw_number = state.draws.current_draw().await?;
    let total_tickets = match &draw_number {
        Some(draw) => state.draws.ticket_count(draw).await?,
        None => 0,
    };

    Ok(Json(StatsResponse {
        draw_number,
        total_tickets,
        last_updated: Utc::now().to_rfc3339(),
    }))
}

/// Predictions recorded for past draws, newest first
///
/// GET /api/history
pub async fn history(State(state): State<AppState>) -> Result<Json<Vec<HistoricalPrediction>>> {
    Ok(Json(state.draws.history().await?))
}
