// src/handlers/invoices.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        auth::RequestContext,
        invoice::{InvoiceInput, LineItemInput},
    },
};

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemPayload {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePayload {
    #[validate(length(min = 1, message = "Customer name is required."))]
    pub customer_name: String,

    pub client_id: Option<Uuid>,

    #[validate(length(min = 1, message = "At least one line item is required."))]
    pub items: Vec<LineItemPayload>,

    pub discount: Option<Decimal>,
    pub notes: Option<String>,
    pub payment_terms: Option<String>,
}

impl From<InvoicePayload> for InvoiceInput {
    fn from(payload: InvoicePayload) -> Self {
        InvoiceInput {
            client_id: payload.client_id,
            customer_name: payload.customer_name,
            items: payload
                .items
                .into_iter()
                .map(|line| LineItemInput {
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
                .collect(),
            discount: payload.discount,
            notes: payload.notes,
            payment_terms: payload.payment_terms,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

// ---
// Handlers
// ---

pub async fn list_invoices(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let invoices = app_state.invoice_service.list().await?;
    Ok((StatusCode::OK, Json(invoices)))
}

pub async fn get_invoice(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = app_state.invoice_service.get(id).await?;
    Ok((StatusCode::OK, Json(invoice)))
}

pub async fn search_invoices(
    State(app_state): State<AppState>,
    Path(customer_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let invoices = app_state
        .invoice_service
        .search_by_customer(&customer_name)
        .await?;
    Ok((StatusCode::OK, Json(invoices)))
}

pub async fn create_invoice(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Json(payload): Json<InvoicePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let invoice = app_state
        .invoice_service
        .create_invoice(&ctx, payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn update_invoice(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<InvoicePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let invoice = app_state
        .invoice_service
        .update_invoice(&ctx, id, payload.into())
        .await?;

    Ok((StatusCode::OK, Json(invoice)))
}

pub async fn change_invoice_status(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = app_state
        .invoice_service
        .change_status(&ctx, id, &query.status)
        .await?;

    Ok((StatusCode::OK, Json(invoice)))
}

pub async fn delete_invoice(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.invoice_service.delete_invoice(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
