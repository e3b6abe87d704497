use axum::{
    async_trait,
    extract::{FromRequestParts, Query, State},
    http::{request::Parts, StatusCode},
    Json,
};
use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::ERR_INVALID_DAY;
use crate::error::{AppError, Result};
use crate::models::{minutes_until, Ticket, ThrottleStatus};
use crate::routes::access::VerifyResponse;
use crate::routes::client::ClientIp;
use crate::security::{client_fingerprint, verify_admin_key};
use crate::store::{parse_day, DirEntryInfo, PathContents};
use crate::AppState;

/// Header carrying the admin key on every admin request
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Proof that the request carried a valid admin key
///
/// Wrong keys count against the admin throttle of the calling IP; a blocked
/// IP is refused before the key is looked at.
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

#[async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let ClientIp(ip) = ClientIp::from_parts(parts);
        let now = Utc::now().timestamp();

        if let ThrottleStatus::Blocked { until } = state.admin_throttle.check(&ip, now) {
            return Err(AppError::Blocked {
                minutes_left: minutes_until(until, now),
            });
        }

        let presented = parts
            .headers
            .get(ADMIN_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        if verify_admin_key(presented, &state.config.admin_key) {
            state.admin_throttle.record(&ip, true, now);
            return Ok(AdminAuth);
        }

        tracing::warn!(
            "Invalid admin key from {}",
            client_fingerprint(&ip, &state.config.admin_key)
        );
        match state.admin_throttle.record(&ip, false, now) {
            ThrottleStatus::Blocked { until } => Err(AppError::Blocked {
                minutes_left: minutes_until(until, now),
            }),
            ThrottleStatus::Allowed { .. } => Err(AppError::Unauthorized),
        }
    }
}

// =============================================================================
// Authentication
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAuthRequest {
    #[serde(default)]
    pub admin_key: String,
}

/// Admin login check, throttled per IP
///
/// POST /<admin-path>/api/auth
pub async fn admin_login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(payload): Json<AdminAuthRequest>,
) -> (StatusCode, Json<VerifyResponse>) {
    let now = Utc::now().timestamp();
    let reply = |status: StatusCode, success: bool, message: String| {
        (status, Json(VerifyResponse { success, message }))
    };

    if let ThrottleStatus::Blocked { until } = state.admin_throttle.check(&ip, now) {
        return reply(
            StatusCode::TOO_MANY_REQUESTS,
            false,
            format!(
                "Access is temporarily restricted after repeated invalid keys. Try again in {} minutes.",
                minutes_until(until, now)
            ),
        );
    }

    let success = !payload.admin_key.is_empty()
        && verify_admin_key(&payload.admin_key, &state.config.admin_key);

    match state.admin_throttle.record(&ip, success, now) {
        _ if success => {
            tracing::info!(
                "Admin login from {}",
                client_fingerprint(&ip, &state.config.admin_key)
            );
            reply(
                StatusCode::OK,
                true,
                "Admin authentication succeeded".to_string(),
            )
        }
        ThrottleStatus::Blocked { until } => {
            tracing::warn!(
                "Admin login blocked for {}",
                client_fingerprint(&ip, &state.config.admin_key)
            );
            reply(
                StatusCode::TOO_MANY_REQUESTS,
                false,
                format!(
                    "Too many failed attempts, access is restricted for {} minutes.",
                    minutes_until(until, now)
                ),
            )
        }
        ThrottleStatus::Allowed { remaining } => reply(
            StatusCode::UNAUTHORIZED,
            false,
            format!("Invalid admin key, remaining attempts: {}", remaining),
        ),
    }
}

// =============================================================================
// Access code
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentKeyResponse {
    pub success: bool,
    pub message: String,
    pub current_key: String,
    pub generated_at: String,
}

/// Today's access code
///
/// POST /<admin-path>/api/key
pub async fn current_key(
    _admin: AdminAuth,
    State(state): State<AppState>,
) -> Result<Json<CurrentKeyResponse>> {
    let current_key = state.access.current_code().await?;

    Ok(Json(CurrentKeyResponse {
        success: true,
        message: "Current access code".to_string(),
        current_key,
        generated_at: Utc::now().to_rfc3339(),
    }))
}

// =============================================================================
// Data directory
// =============================================================================

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadAction {
    List,
    Read,
}

#[derive(Debug, Deserialize)]
pub struct DataQuery {
    pub action: ReadAction,
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataReadResponse {
    pub success: bool,
    pub is_directory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<DirEntryInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Browse the data directory
///
/// GET /<admin-path>/api/data?action=list|read&path=<relative>
pub async fn read_data(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Query(query): Query<DataQuery>,
) -> Result<Json<DataReadResponse>> {
    let contents = match (query.action, query.path.as_deref()) {
        (ReadAction::List, path) => PathContents::Directory(state.data.list(path.unwrap_or("")).await?),
        (ReadAction::Read, Some(path)) => state.data.read(path).await?,
        (ReadAction::Read, None) => {
            return Err(AppError::InvalidInput("Missing path parameter".to_string()))
        }
    };

    Ok(Json(match contents {
        PathContents::Directory(entries) => DataReadResponse {
            success: true,
            is_directory: true,
            contents: Some(entries),
            content: None,
        },
        PathContents::File(content) => DataReadResponse {
            success: true,
            is_directory: false,
            contents: None,
            content: Some(content),
        },
    }))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum DataCommand {
    Write {
        path: String,
        content: String,
    },
    Delete {
        path: String,
    },
    Mkdir {
        #[serde(default)]
        path: String,
    },
    /// `path` carries the day (`YYYY-MM-DD`) whose code is replaced
    ResetKey {
        path: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCommandResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_key: Option<String>,
}

/// Modify the data directory
///
/// POST /<admin-path>/api/data
pub async fn modify_data(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Json(command): Json<DataCommand>,
) -> Result<Json<DataCommandResponse>> {
    let response = |message: String, new_key: Option<String>| {
        Json(DataCommandResponse {
            success: true,
            message,
            new_key,
        })
    };

    match command {
        DataCommand::Write { path, content } => {
            state.data.write(&path, &content).await?;
            tracing::info!("Admin wrote {}", path);
            Ok(response("File saved".to_string(), None))
        }
        DataCommand::Delete { path } => {
            state.data.delete(&path).await?;
            tracing::info!("Admin deleted {}", path);
            Ok(response("File deleted".to_string(), None))
        }
        DataCommand::Mkdir { path } => {
            state.data.mkdir(&path).await?;
            Ok(response("Directory created".to_string(), None))
        }
        DataCommand::ResetKey { path } => {
            let day = parse_day(&path)
                .ok_or_else(|| AppError::InvalidInput(ERR_INVALID_DAY.to_string()))?;
            let new_key = state.access.keys().reset(day).await?;
            Ok(response(
                format!("Access code for {} has been reset", day),
                Some(new_key),
            ))
        }
    }
}

// =============================================================================
// Draws and predictions
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDrawRequest {
    pub draw_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePredictionsRequest {
    /// Defaults to the current draw
    pub draw_number: Option<String>,
    /// One ticket per line
    pub predictions: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDrawResponse {
    pub success: bool,
    pub draw_number: String,
    pub message: String,
}

/// Set the draw submissions are filed under
///
/// POST /<admin-path>/api/draw
pub async fn set_draw(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Json(payload): Json<SetDrawRequest>,
) -> Result<Json<AdminDrawResponse>> {
    state.draws.set_current_draw(&payload.draw_number).await?;
    let draw_number = payload.draw_number.trim().to_string();

    Ok(Json(AdminDrawResponse {
        success: true,
        message: format!("Current draw set to {}", draw_number),
        draw_number,
    }))
}

/// Replace the prediction lines for a draw
///
/// POST /<admin-path>/api/predictions
pub async fn save_predictions(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Json(payload): Json<SavePredictionsRequest>,
) -> Result<Json<AdminDrawResponse>> {
    let draw_number = match payload.draw_number {
        Some(draw) => draw.trim().to_string(),
        None => state.draws.require_current_draw().await?,
    };

    let tickets = payload
        .predictions
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.parse::<Ticket>()
                .map_err(|e| AppError::InvalidInput(format!("Invalid prediction '{}': {}", line, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    if tickets.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one prediction is required".to_string(),
        ));
    }

    state.draws.save_predictions(&draw_number, &tickets).await?;

    Ok(Json(AdminDrawResponse {
        success: true,
        message: format!(
            "Saved {} predictions on {}",
            tickets.len(),
            Local::now().format("%Y-%m-%d %H:%M")
        ),
        draw_number,
    }))
}
