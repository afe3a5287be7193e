// src/handlers/activity_logs.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{common::error::AppError, config::AppState};

// GET /api/activity-logs — newest first.
pub async fn list_activity_logs(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let logs = app_state.activity_log_service.list().await?;
    Ok((StatusCode::OK, Json(logs)))
}
