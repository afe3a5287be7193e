// src/handlers/clients.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    db::ClientStore,
    models::{activity::LogAction, auth::RequestContext, client::ClientInput},
};

const ENTITY_TYPE: &str = "CLIENT";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClientPayload {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,

    #[validate(email(message = "Invalid e-mail address."))]
    pub email: Option<String>,

    pub phone: Option<String>,
    pub address: Option<String>,
}

impl From<ClientPayload> for ClientInput {
    fn from(payload: ClientPayload) -> Self {
        ClientInput {
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            address: payload.address,
        }
    }
}

pub async fn list_clients(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let clients = app_state.clients.list().await?;
    Ok((StatusCode::OK, Json(clients)))
}

pub async fn get_client(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let client = app_state
        .clients
        .get(id)
        .await?
        .ok_or(AppError::ClientNotFound(id))?;
    Ok((StatusCode::OK, Json(client)))
}

pub async fn create_client(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Json(payload): Json<ClientPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let client = app_state.clients.insert(payload.into()).await?;

    app_state
        .activity_log_service
        .log(
            &ctx,
            LogAction::Create,
            ENTITY_TYPE,
            Some(client.id),
            format!("Created client: {}", client.name),
        )
        .await;

    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn update_client(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClientPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let client = app_state
        .clients
        .update(id, payload.into())
        .await?
        .ok_or(AppError::ClientNotFound(id))?;

    app_state
        .activity_log_service
        .log(
            &ctx,
            LogAction::Update,
            ENTITY_TYPE,
            Some(client.id),
            format!("Updated client: {}", client.name),
        )
        .await;

    Ok((StatusCode::OK, Json(client)))
}

pub async fn delete_client(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let client = app_state
        .clients
        .get(id)
        .await?
        .ok_or(AppError::ClientNotFound(id))?;

    if !app_state.clients.delete(id).await? {
        return Err(AppError::ClientNotFound(id));
    }

    app_state
        .activity_log_service
        .log(
            &ctx,
            LogAction::Delete,
            ENTITY_TYPE,
            Some(id),
            format!("Deleted client: {}", client.name),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
