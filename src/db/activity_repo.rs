// src/db/activity_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{common::error::AppError, db::ActivityLogStore, models::activity::ActivityLog};

#[derive(Clone)]
pub struct ActivityLogRepository {
    pool: PgPool,
}

impl ActivityLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityLogStore for ActivityLogRepository {
    async fn append(&self, entry: &ActivityLog) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO activity_logs (
                id, username, user_role, action, entity_type, entity_id,
                details, ip_address, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.username)
        .bind(&entry.user_role)
        .bind(entry.action)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.details)
        .bind(&entry.ip_address)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ActivityLog>, AppError> {
        let logs = sqlx::query_as::<_, ActivityLog>(
            "SELECT * FROM activity_logs ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }
}
