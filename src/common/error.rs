// src/common/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("invalid line item: {0}")]
    InvalidLineItem(String),

    #[error("tax rate cannot be negative")]
    InvalidTaxRate,

    #[error("'{0}' is not a valid invoice status")]
    InvalidStatus(String),

    #[error("product {0} not found")]
    ProductNotFound(Uuid),

    #[error("invoice {0} not found")]
    InvoiceNotFound(Uuid),

    #[error("client {0} not found")]
    ClientNotFound(Uuid),

    #[error("insufficient stock for product {product_id}: {available} available, {requested} requested")]
    InsufficientStock {
        product_id: Uuid,
        available: i32,
        requested: i32,
    },

    #[error("conflict: {0}")]
    Conflict(String),

    // A compensating release failed after an earlier pipeline step already took
    // effect. Stock or counters may be out of sync with reality; this variant
    // must never be collapsed into anything milder.
    #[error("partial failure: {0}")]
    PartialFailure(String),

    #[error("database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("internal server error")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "One or more fields are invalid.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InsufficientStock {
                product_id,
                available,
                requested,
            } => {
                let body = Json(json!({
                    "error": self.to_string(),
                    "productId": product_id,
                    "available": available,
                    "requested": requested,
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::InvalidLineItem(_) | AppError::InvalidTaxRate | AppError::InvalidStatus(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::ProductNotFound(_)
            | AppError::InvoiceNotFound(_)
            | AppError::ClientNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::PartialFailure(details) => {
                tracing::error!("partial failure, state may be inconsistent: {}", details);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            // Storage and unexpected errors become opaque 500s; tracing keeps
            // the detailed message thiserror gave us.
            e => {
                tracing::error!("internal server error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
