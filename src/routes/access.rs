use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::access::VerifyOutcome;
use crate::error::Result;
use crate::routes::client::ClientIp;
use crate::security::{client_fingerprint, md5_hex};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub message: String,
}

impl VerifyResponse {
    pub fn status(outcome: &VerifyOutcome) -> StatusCode {
        match outcome {
            VerifyOutcome::Granted | VerifyOutcome::Checked => StatusCode::OK,
            VerifyOutcome::Rejected { .. } => StatusCode::UNAUTHORIZED,
            VerifyOutcome::Blocked { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for VerifyOutcome {
    fn into_response(self) -> Response {
        let body = VerifyResponse {
            success: self.success(),
            message: self.message(),
        };
        (VerifyResponse::status(&self), Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionsResponse {
    pub success: bool,
    pub draw_number: Option<String>,
    pub predictions: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyCheckResponse {
    pub success: bool,
    pub message: String,
    /// MD5 of the current code, so monitors can detect rotation without seeing it
    pub encrypted_key: String,
    pub checked_at: String,
}

/// Verify a daily access code
///
/// POST /api/access/verify
pub async fn verify_code(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(payload): Json<VerifyRequest>,
) -> Result<VerifyOutcome> {
    let outcome = state.access.verify(&payload.code, &ip).await?;

    tracing::info!(
        "Access code verification for {}: {:?}",
        client_fingerprint(&ip, &state.config.admin_key),
        outcome
    );

    Ok(outcome)
}

/// Predictions for the current draw, released only with today's access code
///
/// POST /api/predictions
pub async fn view_predictions(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(payload): Json<VerifyRequest>,
) -> Result<Response> {
    let outcome = state.access.verify(&payload.code, &ip).await?;
    if outcome != VerifyOutcome::Granted {
        return Ok(outcome.into_response());
    }

    let draw_number = state.draws.current_draw().await?;
    let predictions = state.draws.predictions(draw_number.as_deref()).await?;

    Ok(Json(PredictionsResponse {
        success: true,
        draw_number,
        predictions,
    })
    .into_response())
}

/// Trigger a rotation check and report a digest of the current code
///
/// GET /api/key-check
pub async fn key_check(State(state): State<AppState>) -> Result<Json<KeyCheckResponse>> {
    let current = state.access.current_code().await?;

    Ok(Json(KeyCheckResponse {
        success: true,
        message: "Access code check complete".to_string(),
        encrypted_key: md5_hex(&current),
        checked_at: Utc::now().to_rfc3339(),
    }))
}
