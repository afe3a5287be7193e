// src/handlers/products.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::AppError,
    config::AppState,
    db::ProductStore,
    models::{activity::LogAction, auth::RequestContext, product::ProductInput},
};

const ENTITY_TYPE: &str = "PRODUCT";
const LOW_STOCK_THRESHOLD: i32 = 10;

fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.message = Some("The value cannot be negative.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,

    pub description: Option<String>,

    #[validate(custom(function = "validate_not_negative"))]
    pub price: Decimal,

    #[validate(range(min = 0, message = "Stock quantity cannot be negative."))]
    pub stock_quantity: i32,

    pub category: Option<String>,
}

impl From<ProductPayload> for ProductInput {
    fn from(payload: ProductPayload) -> Self {
        ProductInput {
            name: payload.name,
            description: payload.description,
            price: payload.price,
            stock_quantity: payload.stock_quantity,
            category: payload.category,
        }
    }
}

pub async fn list_products(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let products = app_state.products.list().await?;
    Ok((StatusCode::OK, Json(products)))
}

pub async fn get_product(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let product = app_state
        .products
        .get(id)
        .await?
        .ok_or(AppError::ProductNotFound(id))?;
    Ok((StatusCode::OK, Json(product)))
}

pub async fn create_product(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Json(payload): Json<ProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let product = app_state.products.insert(payload.into()).await?;

    app_state
        .activity_log_service
        .log(
            &ctx,
            LogAction::Create,
            ENTITY_TYPE,
            Some(product.id),
            format!(
                "Created product: {}, price: {}, stock: {}",
                product.name, product.price, product.stock_quantity
            ),
        )
        .await;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let product = app_state
        .products
        .update(id, payload.into())
        .await?
        .ok_or(AppError::ProductNotFound(id))?;

    app_state
        .activity_log_service
        .log(
            &ctx,
            LogAction::Update,
            ENTITY_TYPE,
            Some(product.id),
            format!(
                "Updated product: {}, new price: {}, stock: {}",
                product.name, product.price, product.stock_quantity
            ),
        )
        .await;

    Ok((StatusCode::OK, Json(product)))
}

pub async fn delete_product(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let product = app_state
        .products
        .get(id)
        .await?
        .ok_or(AppError::ProductNotFound(id))?;

    if !app_state.products.delete(id).await? {
        return Err(AppError::ProductNotFound(id));
    }

    app_state
        .activity_log_service
        .log(
            &ctx,
            LogAction::Delete,
            ENTITY_TYPE,
            Some(id),
            format!("Deleted product: {}", product.name),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_products_by_category(
    State(app_state): State<AppState>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let products = app_state.products.list_by_category(&category).await?;
    Ok((StatusCode::OK, Json(products)))
}

pub async fn search_products(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let products = app_state.products.search_by_name(&name).await?;
    Ok((StatusCode::OK, Json(products)))
}

pub async fn list_low_stock_products(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let products = app_state.products.list_low_stock(LOW_STOCK_THRESHOLD).await?;
    Ok((StatusCode::OK, Json(products)))
}
