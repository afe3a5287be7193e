// src/models/settings.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Singleton company settings row. `next_invoice_number` is the counter
/// behind the sequence allocator: positive, monotone, never reused even when
/// the invoice holding a number is later deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CompanySettings {
    pub id: Uuid,
    pub company_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub tax_number: Option<String>,
    pub bank_account: Option<String>,
    pub invoice_prefix: String,
    pub next_invoice_number: i32,
    pub default_tax_rate: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Updatable settings fields. The numbering counter is writable here on
/// purpose (the original system lets administrators re-seat it); the
/// allocator still only ever moves it forward.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsInput {
    pub company_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub tax_number: Option<String>,
    pub bank_account: Option<String>,
    pub invoice_prefix: String,
    pub next_invoice_number: i32,
    pub default_tax_rate: Decimal,
    pub currency: String,
}
