// src/services/invoice_service.rs
//
// The invoice commit pipeline. Each mutation is a short state machine over
// the stores: validate, reserve stock line by line, compute totals, allocate
// a number, persist the aggregate, audit. Any failure after stock was
// reserved triggers compensating releases before the call returns; a failed
// compensation surfaces as PartialFailure instead of being swallowed.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{InvoiceStore, ProductStore, SettingsStore},
    models::{
        activity::LogAction,
        auth::RequestContext,
        invoice::{Invoice, InvoiceInput, InvoiceItem, InvoiceStatus},
    },
    services::{activity_log_service::ActivityLogService, calculator},
};

const ENTITY_TYPE: &str = "INVOICE";
const DUE_DAYS: i64 = 30;

#[derive(Clone)]
pub struct InvoiceService {
    products: Arc<dyn ProductStore>,
    invoices: Arc<dyn InvoiceStore>,
    settings: Arc<dyn SettingsStore>,
    audit: ActivityLogService,
}

impl InvoiceService {
    pub fn new(
        products: Arc<dyn ProductStore>,
        invoices: Arc<dyn InvoiceStore>,
        settings: Arc<dyn SettingsStore>,
        audit: ActivityLogService,
    ) -> Self {
        Self {
            products,
            invoices,
            settings,
            audit,
        }
    }

    // ---
    // Reads
    // ---

    pub async fn list(&self) -> Result<Vec<Invoice>, AppError> {
        self.invoices.list().await
    }

    pub async fn get(&self, id: Uuid) -> Result<Invoice, AppError> {
        self.invoices
            .get(id)
            .await?
            .ok_or(AppError::InvoiceNotFound(id))
    }

    pub async fn search_by_customer(&self, fragment: &str) -> Result<Vec<Invoice>, AppError> {
        self.invoices.search_by_customer(fragment).await
    }

    // ---
    // Create
    // ---

    pub async fn create_invoice(
        &self,
        ctx: &RequestContext,
        input: InvoiceInput,
    ) -> Result<Invoice, AppError> {
        validate_lines(&input)?;

        let settings = self.settings.get_or_init().await?;
        let invoice_id = Uuid::new_v4();

        let (items, reserved) = self.reserve_lines(invoice_id, &input).await?;

        let discount = input.discount.unwrap_or(Decimal::ZERO);
        let totals = match self.totals_for(&items, settings.default_tax_rate, discount) {
            Ok(t) => t,
            Err(e) => return self.fail_with_rollback(e, &reserved).await,
        };

        let invoice_number = match self.settings.allocate_invoice_number().await {
            Ok(n) => n,
            Err(e) => return self.fail_with_rollback(e, &reserved).await,
        };

        let now = Utc::now();
        let invoice_date = now.date_naive();
        let invoice = Invoice {
            id: invoice_id,
            invoice_number,
            client_id: input.client_id,
            customer_name: input.customer_name,
            invoice_date,
            due_date: invoice_date + Duration::days(DUE_DAYS),
            subtotal: totals.subtotal,
            tax_rate: settings.default_tax_rate,
            tax_amount: totals.tax_amount,
            discount,
            total_amount: totals.total,
            notes: input.notes,
            payment_terms: input.payment_terms,
            status: InvoiceStatus::Pending,
            items,
            created_at: now,
        };

        if let Err(e) = self.invoices.persist(&invoice).await {
            // The number stays allocated; only the stock comes back.
            return self.fail_with_rollback(e, &reserved).await;
        }

        self.audit
            .log(
                ctx,
                LogAction::Create,
                ENTITY_TYPE,
                Some(invoice.id),
                format!(
                    "Created invoice {} for customer {}, total: {}",
                    invoice.invoice_number, invoice.customer_name, invoice.total_amount
                ),
            )
            .await;

        Ok(invoice)
    }

    // ---
    // Update
    // ---

    /// Replaces the invoice's line-item set wholesale. The invoice number,
    /// creation timestamp and tax-rate snapshot are immutable; stock held by
    /// the old items is released before the new reservations are attempted.
    pub async fn update_invoice(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        input: InvoiceInput,
    ) -> Result<Invoice, AppError> {
        validate_lines(&input)?;

        let mut invoice = self
            .invoices
            .get(id)
            .await?
            .ok_or(AppError::InvoiceNotFound(id))?;

        // Undo the prior reservations before anything else touches stock.
        for item in &invoice.items {
            self.products.release(item.product_id, item.quantity).await?;
        }

        // Discard the old item set. If the new reservations fail below, the
        // invoice stays committed with no items until a successful retry;
        // that is accepted rather than silently re-applying the old lines.
        invoice.items.clear();
        invoice.subtotal = Decimal::ZERO;
        invoice.tax_amount = Decimal::ZERO;
        invoice.total_amount = Decimal::ZERO;
        invoice.client_id = input.client_id;
        invoice.customer_name = input.customer_name.clone();
        invoice.notes = input.notes.clone();
        invoice.payment_terms = input.payment_terms.clone();
        self.invoices.persist(&invoice).await?;

        let (items, reserved) = self.reserve_lines(invoice.id, &input).await?;

        if let Some(discount) = input.discount {
            invoice.discount = discount;
        }
        let totals = match self.totals_for(&items, invoice.tax_rate, invoice.discount) {
            Ok(t) => t,
            Err(e) => return self.fail_with_rollback(e, &reserved).await,
        };

        invoice.items = items;
        invoice.subtotal = totals.subtotal;
        invoice.tax_amount = totals.tax_amount;
        invoice.total_amount = totals.total;

        if let Err(e) = self.invoices.persist(&invoice).await {
            return self.fail_with_rollback(e, &reserved).await;
        }

        self.audit
            .log(
                ctx,
                LogAction::Update,
                ENTITY_TYPE,
                Some(invoice.id),
                format!(
                    "Updated invoice {}, customer: {}, new total: {}",
                    invoice.invoice_number, invoice.customer_name, invoice.total_amount
                ),
            )
            .await;

        Ok(invoice)
    }

    // ---
    // Status change
    // ---

    /// Transitions are free-form; only the status string itself is checked.
    /// No stock or totals side effects.
    pub async fn change_status(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        status: &str,
    ) -> Result<Invoice, AppError> {
        let new_status = InvoiceStatus::from_str(status)
            .map_err(|_| AppError::InvalidStatus(status.to_string()))?;

        let mut invoice = self
            .invoices
            .get(id)
            .await?
            .ok_or(AppError::InvoiceNotFound(id))?;

        let old_status = invoice.status;
        invoice.status = new_status;
        self.invoices.persist(&invoice).await?;

        self.audit
            .log(
                ctx,
                LogAction::StatusChange,
                ENTITY_TYPE,
                Some(invoice.id),
                format!(
                    "Changed invoice {} status from {} to {}",
                    invoice.invoice_number, old_status, new_status
                ),
            )
            .await;

        Ok(invoice)
    }

    // ---
    // Delete
    // ---

    /// Releases the stock held by every line item, then removes the
    /// aggregate. The invoice number is permanently retired.
    pub async fn delete_invoice(&self, ctx: &RequestContext, id: Uuid) -> Result<(), AppError> {
        let invoice = self
            .invoices
            .get(id)
            .await?
            .ok_or(AppError::InvoiceNotFound(id))?;

        for item in &invoice.items {
            self.products.release(item.product_id, item.quantity).await?;
        }

        self.invoices.delete(id).await?;

        self.audit
            .log(
                ctx,
                LogAction::Delete,
                ENTITY_TYPE,
                Some(id),
                format!(
                    "Deleted invoice {} for customer {}",
                    invoice.invoice_number, invoice.customer_name
                ),
            )
            .await;

        Ok(())
    }

    // ---
    // Pipeline internals
    // ---

    /// Looks up and reserves every requested line in order, snapshotting the
    /// product price into the item. On any failure the reservations already
    /// taken in this call are released before the error is returned, so no
    /// partial stock consumption leaks out.
    async fn reserve_lines(
        &self,
        invoice_id: Uuid,
        input: &InvoiceInput,
    ) -> Result<(Vec<InvoiceItem>, Vec<(Uuid, i32)>), AppError> {
        let mut items = Vec::with_capacity(input.items.len());
        let mut reserved: Vec<(Uuid, i32)> = Vec::new();

        for (index, line) in input.items.iter().enumerate() {
            let product = match self.products.get(line.product_id).await {
                Ok(Some(p)) => p,
                Ok(None) => {
                    return self
                        .fail_with_rollback(AppError::ProductNotFound(line.product_id), &reserved)
                        .await;
                }
                Err(e) => return self.fail_with_rollback(e, &reserved).await,
            };

            if let Err(e) = self.products.reserve(line.product_id, line.quantity).await {
                return self.fail_with_rollback(e, &reserved).await;
            }
            reserved.push((line.product_id, line.quantity));

            let subtotal = match calculator::line_subtotal(product.price, line.quantity) {
                Ok(s) => s,
                Err(e) => return self.fail_with_rollback(e, &reserved).await,
            };

            items.push(InvoiceItem {
                id: Uuid::new_v4(),
                invoice_id,
                line_no: (index + 1) as i32,
                product_id: product.id,
                product_name: product.name,
                quantity: line.quantity,
                unit_price: product.price,
                subtotal,
            });
        }

        Ok((items, reserved))
    }

    fn totals_for(
        &self,
        items: &[InvoiceItem],
        tax_rate: Decimal,
        discount: Decimal,
    ) -> Result<calculator::InvoiceTotals, AppError> {
        let lines: Vec<(Decimal, i32)> = items
            .iter()
            .map(|item| (item.unit_price, item.quantity))
            .collect();
        calculator::compute_totals(&lines, tax_rate, discount)
    }

    /// Compensating action: release everything reserved so far, then return
    /// the original error. If a release itself fails, stock is out of sync
    /// and PartialFailure takes precedence over the original error.
    async fn fail_with_rollback<T>(
        &self,
        error: AppError,
        reserved: &[(Uuid, i32)],
    ) -> Result<T, AppError> {
        for &(product_id, quantity) in reserved {
            if let Err(release_err) = self.products.release(product_id, quantity).await {
                return Err(AppError::PartialFailure(format!(
                    "while handling '{error}': failed to release {quantity} unit(s) of product {product_id}: {release_err}"
                )));
            }
        }
        Err(error)
    }
}

fn validate_lines(input: &InvoiceInput) -> Result<(), AppError> {
    if input.items.is_empty() {
        return Err(AppError::InvalidLineItem(
            "invoice must contain at least one line item".to_string(),
        ));
    }
    for line in &input.items {
        if line.quantity <= 0 {
            return Err(AppError::InvalidLineItem(format!(
                "quantity must be positive, got {}",
                line.quantity
            )));
        }
    }
    Ok(())
}
