// src/services/activity_log_service.rs

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ActivityLogStore,
    models::{
        activity::{ActivityLog, LogAction},
        auth::RequestContext,
    },
};

/// Records one immutable audit entry per accepted mutation. Writing is best
/// effort: a failed append is reported via tracing but never aborts or rolls
/// back the business operation it is attached to.
#[derive(Clone)]
pub struct ActivityLogService {
    store: Arc<dyn ActivityLogStore>,
}

impl ActivityLogService {
    pub fn new(store: Arc<dyn ActivityLogStore>) -> Self {
        Self { store }
    }

    pub async fn log(
        &self,
        ctx: &RequestContext,
        action: LogAction,
        entity_type: &str,
        entity_id: Option<Uuid>,
        details: String,
    ) {
        let entry = ActivityLog {
            id: Uuid::new_v4(),
            username: ctx.user.username.clone(),
            user_role: ctx.user.role_string(),
            action,
            entity_type: entity_type.to_string(),
            entity_id,
            details,
            ip_address: ctx.ip_address.clone(),
            created_at: Utc::now(),
        };

        if let Err(e) = self.store.append(&entry).await {
            tracing::error!(
                action = %action,
                entity_type,
                "failed to write activity log entry: {}",
                e
            );
        }
    }

    pub async fn list(&self) -> Result<Vec<ActivityLog>, AppError> {
        self.store.list().await
    }
}
