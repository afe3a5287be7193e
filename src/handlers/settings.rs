// src/handlers/settings.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::{
    common::error::AppError, config::AppState, db::SettingsStore,
    models::settings::SettingsInput,
};

// GET /api/company — creates the default settings row on first access.
pub async fn get_settings(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let settings = app_state.settings.get_or_init().await?;
    Ok((StatusCode::OK, Json(settings)))
}

// PUT /api/company
pub async fn update_settings(
    State(app_state): State<AppState>,
    Json(payload): Json<SettingsInput>,
) -> Result<impl IntoResponse, AppError> {
    if payload.default_tax_rate.is_sign_negative() {
        return Err(AppError::InvalidTaxRate);
    }
    let settings = app_state.settings.update(payload).await?;
    Ok((StatusCode::OK, Json(settings)))
}

// POST /api/company/generate-invoice-number — consumes a number from the
// same allocator the pipeline uses; the counter moves forward either way.
pub async fn generate_invoice_number(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let invoice_number = app_state.settings.allocate_invoice_number().await?;
    Ok((StatusCode::OK, Json(json!({ "invoiceNumber": invoice_number }))))
}
