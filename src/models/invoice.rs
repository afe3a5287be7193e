// src/models/invoice.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Invoice lifecycle status. Transitions are free-form: any state is
/// reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Sent,
    Paid,
    Cancelled,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::Sent => "SENT",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Cancelled => "CANCELLED",
            InvoiceStatus::Overdue => "OVERDUE",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(InvoiceStatus::Draft),
            "PENDING" => Ok(InvoiceStatus::Pending),
            "SENT" => Ok(InvoiceStatus::Sent),
            "PAID" => Ok(InvoiceStatus::Paid),
            "CANCELLED" => Ok(InvoiceStatus::Cancelled),
            "OVERDUE" => Ok(InvoiceStatus::Overdue),
            _ => Err(()),
        }
    }
}

/// One line of an invoice. Items have no identity outside their invoice:
/// the whole set is replaced on update and removed on delete. `unit_price`
/// is a snapshot of the product price at commit time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub line_no: i32,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Invoice aggregate. `invoice_number` and `created_at` never change after
/// creation; `tax_rate` is snapshotted from company settings at creation and
/// kept across updates. Invariants: subtotal = sum of item subtotals,
/// total = subtotal + tax_amount - discount, all rounded to 2 decimals.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub client_id: Option<Uuid>,
    pub customer_name: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub discount: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub payment_terms: Option<String>,
    pub status: InvoiceStatus,
    #[sqlx(skip)]
    pub items: Vec<InvoiceItem>,
    pub created_at: DateTime<Utc>,
}

/// One requested line of a create/update call.
#[derive(Debug, Clone)]
pub struct LineItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Input for the commit pipeline. Update calls use the same shape; the
/// existing invoice number, creation timestamp and tax-rate snapshot are
/// reused.
#[derive(Debug, Clone)]
pub struct InvoiceInput {
    pub client_id: Option<Uuid>,
    pub customer_name: String,
    pub items: Vec<LineItemInput>,
    pub discount: Option<Decimal>,
    pub notes: Option<String>,
    pub payment_terms: Option<String>,
}
