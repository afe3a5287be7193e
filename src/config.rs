// src/config.rs

use sqlx::{PgPool, postgres::PgPoolOptions};
use std::sync::Arc;
use std::{env, time::Duration};

use crate::{
    db::{
        ActivityLogRepository, ClientRepository, ClientStore, InvoiceRepository,
        ProductRepository, ProductStore, SettingsRepository, SettingsStore,
    },
    services::{ActivityLogService, InvoiceService},
};

/// Shared application state: the pool, the store handles and the services
/// wired over them.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub products: Arc<dyn ProductStore>,
    pub clients: Arc<dyn ClientStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub invoice_service: InvoiceService,
    pub activity_log_service: ActivityLogService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_default();

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("database connection established");

        // Dependency graph: repositories behind the store seams, services on
        // top of them.
        let products: Arc<dyn ProductStore> = Arc::new(ProductRepository::new(db_pool.clone()));
        let clients: Arc<dyn ClientStore> = Arc::new(ClientRepository::new(db_pool.clone()));
        let settings: Arc<dyn SettingsStore> = Arc::new(SettingsRepository::new(db_pool.clone()));
        let invoices = Arc::new(InvoiceRepository::new(db_pool.clone()));
        let activity_logs = Arc::new(ActivityLogRepository::new(db_pool.clone()));

        let activity_log_service = ActivityLogService::new(activity_logs);
        let invoice_service = InvoiceService::new(
            products.clone(),
            invoices,
            settings.clone(),
            activity_log_service.clone(),
        );

        Ok(Self {
            db_pool,
            jwt_secret,
            products,
            clients,
            settings,
            invoice_service,
            activity_log_service,
        })
    }
}
