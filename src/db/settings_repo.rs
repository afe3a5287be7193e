// src/db/settings_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{SettingsStore, format_invoice_number},
    models::settings::{CompanySettings, SettingsInput},
};

const SETTINGS_COLUMNS: &str = "id, company_name, address, city, postal_code, country, phone, \
     email, website, tax_number, bank_account, invoice_prefix, next_invoice_number, \
     default_tax_rate, currency, created_at, updated_at";

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Idempotent: the singleton row is created once, with column defaults.
    async fn ensure_row(&self) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO company_settings (singleton) VALUES (TRUE) ON CONFLICT (singleton) DO NOTHING",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for SettingsRepository {
    async fn get_or_init(&self) -> Result<CompanySettings, AppError> {
        self.ensure_row().await?;
        let settings = sqlx::query_as::<_, CompanySettings>(&format!(
            "SELECT {SETTINGS_COLUMNS} FROM company_settings"
        ))
        .fetch_one(&self.pool)
        .await?;
        Ok(settings)
    }

    async fn update(&self, input: SettingsInput) -> Result<CompanySettings, AppError> {
        self.ensure_row().await?;
        let settings = sqlx::query_as::<_, CompanySettings>(&format!(
            r#"
            UPDATE company_settings SET
                company_name = $1, address = $2, city = $3, postal_code = $4,
                country = $5, phone = $6, email = $7, website = $8,
                tax_number = $9, bank_account = $10, invoice_prefix = $11,
                next_invoice_number = $12, default_tax_rate = $13, currency = $14,
                updated_at = now()
            RETURNING {SETTINGS_COLUMNS}
            "#
        ))
        .bind(&input.company_name)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.postal_code)
        .bind(&input.country)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.website)
        .bind(&input.tax_number)
        .bind(&input.bank_account)
        .bind(&input.invoice_prefix)
        .bind(input.next_invoice_number)
        .bind(input.default_tax_rate)
        .bind(&input.currency)
        .fetch_one(&self.pool)
        .await?;
        Ok(settings)
    }

    async fn allocate_invoice_number(&self) -> Result<String, AppError> {
        self.ensure_row().await?;

        // Read-and-increment as one statement; concurrent callers serialize
        // on the row lock, so no two of them see the same counter value.
        let (prefix, allocated): (String, i32) = sqlx::query_as(
            r#"
            UPDATE company_settings
            SET next_invoice_number = next_invoice_number + 1, updated_at = now()
            RETURNING invoice_prefix, next_invoice_number - 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(format_invoice_number(&prefix, allocated))
    }
}
