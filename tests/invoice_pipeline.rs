// tests/invoice_pipeline.rs
//
// End-to-end coverage of the invoice commit pipeline over the in-memory
// store: stock reservation and compensation, number allocation, totals,
// status changes and the audit trail.

use async_trait::async_trait;
use chrono::Duration;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use facturio::{
    common::error::AppError,
    db::{ActivityLogStore, InvoiceStore, MemoryStore, ProductStore, SettingsStore},
    models::{
        activity::{ActivityLog, LogAction},
        auth::RequestContext,
        invoice::{Invoice, InvoiceInput, InvoiceStatus, LineItemInput},
        product::{Product, ProductInput},
    },
    services::{ActivityLogService, InvoiceService},
};

fn service_over(store: &MemoryStore) -> InvoiceService {
    let audit = ActivityLogService::new(Arc::new(store.clone()));
    InvoiceService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        audit,
    )
}

fn ctx() -> RequestContext {
    RequestContext::anonymous("127.0.0.1")
}

async fn seed_product(store: &MemoryStore, name: &str, price: Decimal, stock: i32) -> Product {
    ProductStore::insert(
        store,
        ProductInput {
            name: name.to_string(),
            description: None,
            price,
            stock_quantity: stock,
            category: None,
        },
    )
    .await
    .unwrap()
}

fn input_for(lines: Vec<(Uuid, i32)>) -> InvoiceInput {
    InvoiceInput {
        client_id: None,
        customer_name: "ACME Corp".to_string(),
        items: lines
            .into_iter()
            .map(|(product_id, quantity)| LineItemInput {
                product_id,
                quantity,
            })
            .collect(),
        discount: None,
        notes: None,
        payment_terms: None,
    }
}

async fn stock_of(store: &MemoryStore, id: Uuid) -> i32 {
    ProductStore::get(store, id)
        .await
        .unwrap()
        .unwrap()
        .stock_quantity
}

// ---
// Create
// ---

#[tokio::test]
async fn create_commits_stock_number_and_totals() {
    let store = MemoryStore::new();
    let service = service_over(&store);
    let product = seed_product(&store, "Widget", Decimal::new(1000, 2), 5).await;

    let invoice = service
        .create_invoice(&ctx(), input_for(vec![(product.id, 3)]))
        .await
        .unwrap();

    assert_eq!(invoice.invoice_number, "FACT-0001");
    assert_eq!(invoice.status, InvoiceStatus::Pending);
    assert_eq!(invoice.subtotal, Decimal::new(3000, 2));
    assert_eq!(invoice.tax_rate, Decimal::new(200, 1));
    assert_eq!(invoice.tax_amount, Decimal::new(600, 2));
    assert_eq!(invoice.discount, Decimal::ZERO);
    assert_eq!(invoice.total_amount, Decimal::new(3600, 2));
    assert_eq!(invoice.due_date, invoice.invoice_date + Duration::days(30));

    assert_eq!(invoice.items.len(), 1);
    let item = &invoice.items[0];
    assert_eq!(item.line_no, 1);
    assert_eq!(item.product_name, "Widget");
    assert_eq!(item.unit_price, Decimal::new(1000, 2));
    assert_eq!(item.subtotal, Decimal::new(3000, 2));

    assert_eq!(stock_of(&store, product.id).await, 2);

    let persisted = InvoiceStore::get(&store, invoice.id).await.unwrap().unwrap();
    assert_eq!(persisted.invoice_number, "FACT-0001");
}

#[tokio::test]
async fn create_applies_discount_after_tax() {
    let store = MemoryStore::new();
    let service = service_over(&store);
    let product = seed_product(&store, "Widget", Decimal::new(1000, 2), 10).await;

    let mut input = input_for(vec![(product.id, 3)]);
    input.discount = Some(Decimal::new(500, 2));
    let invoice = service.create_invoice(&ctx(), input).await.unwrap();

    // 30.00 + 6.00 - 5.00
    assert_eq!(invoice.total_amount, Decimal::new(3100, 2));
}

#[tokio::test]
async fn create_with_empty_or_non_positive_lines_is_rejected() {
    let store = MemoryStore::new();
    let service = service_over(&store);
    let product = seed_product(&store, "Widget", Decimal::new(1000, 2), 5).await;

    let err = service
        .create_invoice(&ctx(), input_for(vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidLineItem(_)));

    let err = service
        .create_invoice(&ctx(), input_for(vec![(product.id, 0)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidLineItem(_)));

    assert_eq!(stock_of(&store, product.id).await, 5);
}

#[tokio::test]
async fn insufficient_stock_mid_request_releases_earlier_lines() {
    let store = MemoryStore::new();
    let service = service_over(&store);
    let first = seed_product(&store, "Widget", Decimal::new(1000, 2), 10).await;
    let second = seed_product(&store, "Gadget", Decimal::new(2500, 2), 1).await;

    let err = service
        .create_invoice(&ctx(), input_for(vec![(first.id, 2), (second.id, 5)]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::InsufficientStock {
            available: 1,
            requested: 5,
            ..
        }
    ));
    assert_eq!(stock_of(&store, first.id).await, 10);
    assert_eq!(stock_of(&store, second.id).await, 1);
    assert!(InvoiceStore::list(&store).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_product_rolls_back_reservations() {
    let store = MemoryStore::new();
    let service = service_over(&store);
    let product = seed_product(&store, "Widget", Decimal::new(1000, 2), 10).await;
    let missing = Uuid::new_v4();

    let err = service
        .create_invoice(&ctx(), input_for(vec![(product.id, 4), (missing, 1)]))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ProductNotFound(id) if id == missing));
    assert_eq!(stock_of(&store, product.id).await, 10);
}

// ---
// Update
// ---

#[tokio::test]
async fn update_replaces_items_and_nets_out_stock() {
    let store = MemoryStore::new();
    let service = service_over(&store);
    let product = seed_product(&store, "Widget", Decimal::new(1000, 2), 10).await;

    let created = service
        .create_invoice(&ctx(), input_for(vec![(product.id, 5)]))
        .await
        .unwrap();
    assert_eq!(stock_of(&store, product.id).await, 5);

    let updated = service
        .update_invoice(&ctx(), created.id, input_for(vec![(product.id, 2)]))
        .await
        .unwrap();

    assert_eq!(stock_of(&store, product.id).await, 8);
    assert_eq!(updated.invoice_number, created.invoice_number);
    assert_eq!(updated.tax_rate, created.tax_rate);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.subtotal, Decimal::new(2000, 2));
    assert_eq!(updated.total_amount, Decimal::new(2400, 2));
    assert_eq!(updated.items.len(), 1);
    assert_eq!(updated.items[0].quantity, 2);
}

#[tokio::test]
async fn failed_update_leaves_invoice_without_items_and_stock_released() {
    let store = MemoryStore::new();
    let service = service_over(&store);
    let product = seed_product(&store, "Widget", Decimal::new(1000, 2), 10).await;

    let created = service
        .create_invoice(&ctx(), input_for(vec![(product.id, 5)]))
        .await
        .unwrap();

    let err = service
        .update_invoice(&ctx(), created.id, input_for(vec![(product.id, 99)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));

    // The old reservation is gone and the aggregate stays committed, empty.
    assert_eq!(stock_of(&store, product.id).await, 10);
    let reloaded = InvoiceStore::get(&store, created.id).await.unwrap().unwrap();
    assert!(reloaded.items.is_empty());
    assert_eq!(reloaded.subtotal, Decimal::ZERO);
    assert_eq!(reloaded.invoice_number, created.invoice_number);
}

#[tokio::test]
async fn update_of_missing_invoice_is_not_found() {
    let store = MemoryStore::new();
    let service = service_over(&store);
    let product = seed_product(&store, "Widget", Decimal::new(1000, 2), 10).await;
    let missing = Uuid::new_v4();

    let err = service
        .update_invoice(&ctx(), missing, input_for(vec![(product.id, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvoiceNotFound(id) if id == missing));
    assert_eq!(stock_of(&store, product.id).await, 10);
}

// ---
// Status
// ---

#[tokio::test]
async fn status_change_accepts_known_states_only() {
    let store = MemoryStore::new();
    let service = service_over(&store);
    let product = seed_product(&store, "Widget", Decimal::new(1000, 2), 5).await;

    let invoice = service
        .create_invoice(&ctx(), input_for(vec![(product.id, 1)]))
        .await
        .unwrap();

    let err = service
        .change_status(&ctx(), invoice.id, "UNPAID")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidStatus(s) if s == "UNPAID"));

    let paid = service
        .change_status(&ctx(), invoice.id, "PAID")
        .await
        .unwrap();
    assert_eq!(paid.status, InvoiceStatus::Paid);

    // No stock side effects.
    assert_eq!(stock_of(&store, product.id).await, 4);
}

// ---
// Delete
// ---

#[tokio::test]
async fn delete_releases_stock_and_retires_the_number() {
    let store = MemoryStore::new();
    let service = service_over(&store);
    let product = seed_product(&store, "Widget", Decimal::new(1000, 2), 5).await;

    let first = service
        .create_invoice(&ctx(), input_for(vec![(product.id, 3)]))
        .await
        .unwrap();
    assert_eq!(first.invoice_number, "FACT-0001");

    service.delete_invoice(&ctx(), first.id).await.unwrap();
    assert_eq!(stock_of(&store, product.id).await, 5);
    assert!(InvoiceStore::get(&store, first.id).await.unwrap().is_none());

    // The counter never moves backwards, even after a delete.
    let second = service
        .create_invoice(&ctx(), input_for(vec![(product.id, 1)]))
        .await
        .unwrap();
    assert_eq!(second.invoice_number, "FACT-0002");
}

// ---
// Concurrency
// ---

#[tokio::test]
async fn concurrent_creates_never_oversell_the_last_unit() {
    let store = MemoryStore::new();
    let service = service_over(&store);
    let product = seed_product(&store, "Widget", Decimal::new(1000, 2), 1).await;

    let a = {
        let service = service.clone();
        let input = input_for(vec![(product.id, 1)]);
        tokio::spawn(async move { service.create_invoice(&ctx(), input).await })
    };
    let b = {
        let service = service.clone();
        let input = input_for(vec![(product.id, 1)]);
        tokio::spawn(async move { service.create_invoice(&ctx(), input).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, AppError::InsufficientStock { .. })));
    assert_eq!(stock_of(&store, product.id).await, 0);
}

#[tokio::test]
async fn concurrent_allocations_yield_distinct_gapless_numbers() {
    let store = MemoryStore::new();

    let mut handles = Vec::new();
    for _ in 0..100 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.allocate_invoice_number().await
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        numbers.insert(handle.await.unwrap().unwrap());
    }

    assert_eq!(numbers.len(), 100);
    for n in 1..=100 {
        assert!(numbers.contains(&format!("FACT-{n:04}")));
    }
}

// ---
// Audit trail
// ---

#[tokio::test]
async fn every_mutation_leaves_an_audit_entry() {
    let store = MemoryStore::new();
    let service = service_over(&store);
    let product = seed_product(&store, "Widget", Decimal::new(1000, 2), 10).await;

    let invoice = service
        .create_invoice(&ctx(), input_for(vec![(product.id, 2)]))
        .await
        .unwrap();
    service
        .update_invoice(&ctx(), invoice.id, input_for(vec![(product.id, 3)]))
        .await
        .unwrap();
    service
        .change_status(&ctx(), invoice.id, "SENT")
        .await
        .unwrap();
    service.delete_invoice(&ctx(), invoice.id).await.unwrap();

    let mut logs = ActivityLogStore::list(&store).await.unwrap();
    logs.sort_by_key(|l| l.created_at);

    let actions: Vec<LogAction> = logs.iter().map(|l| l.action).collect();
    assert_eq!(
        actions,
        vec![
            LogAction::Create,
            LogAction::Update,
            LogAction::StatusChange,
            LogAction::Delete,
        ]
    );

    for entry in &logs {
        assert_eq!(entry.entity_type, "INVOICE");
        assert_eq!(entry.entity_id, Some(invoice.id));
        assert_eq!(entry.username, "Anonymous");
        assert_eq!(entry.user_role, "UNKNOWN");
        assert_eq!(entry.ip_address, "127.0.0.1");
    }

    assert!(logs[0]
        .details
        .contains(&format!("Created invoice {}", invoice.invoice_number)));
    assert!(logs[2].details.contains("status from PENDING to SENT"));
}

struct FailingAuditStore;

#[async_trait]
impl ActivityLogStore for FailingAuditStore {
    async fn append(&self, _entry: &ActivityLog) -> Result<(), AppError> {
        Err(AppError::InternalServerError(anyhow::anyhow!(
            "audit sink offline"
        )))
    }

    async fn list(&self) -> Result<Vec<ActivityLog>, AppError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn audit_failure_never_fails_the_mutation() {
    let store = MemoryStore::new();
    let audit = ActivityLogService::new(Arc::new(FailingAuditStore));
    let service = InvoiceService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        audit,
    );
    let product = seed_product(&store, "Widget", Decimal::new(1000, 2), 5).await;

    let invoice = service
        .create_invoice(&ctx(), input_for(vec![(product.id, 2)]))
        .await
        .unwrap();
    assert_eq!(invoice.invoice_number, "FACT-0001");
    assert_eq!(stock_of(&store, product.id).await, 3);
}

// ---
// Persistence failure compensation
// ---

struct FailingInvoiceStore {
    inner: MemoryStore,
}

#[async_trait]
impl InvoiceStore for FailingInvoiceStore {
    async fn list(&self) -> Result<Vec<Invoice>, AppError> {
        InvoiceStore::list(&self.inner).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Invoice>, AppError> {
        InvoiceStore::get(&self.inner, id).await
    }

    async fn search_by_customer(&self, fragment: &str) -> Result<Vec<Invoice>, AppError> {
        self.inner.search_by_customer(fragment).await
    }

    async fn persist(&self, _invoice: &Invoice) -> Result<(), AppError> {
        Err(AppError::InternalServerError(anyhow::anyhow!(
            "storage offline"
        )))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        InvoiceStore::delete(&self.inner, id).await
    }
}

#[tokio::test]
async fn persist_failure_releases_reserved_stock() {
    let store = MemoryStore::new();
    let invoices = Arc::new(FailingInvoiceStore {
        inner: store.clone(),
    });
    let service = InvoiceService::new(
        Arc::new(store.clone()),
        invoices,
        Arc::new(store.clone()),
        ActivityLogService::new(Arc::new(store.clone())),
    );
    let product = seed_product(&store, "Widget", Decimal::new(1000, 2), 5).await;

    let err = service
        .create_invoice(&ctx(), input_for(vec![(product.id, 3)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InternalServerError(_)));

    // Stock comes back; the allocated number is gone for good.
    assert_eq!(stock_of(&store, product.id).await, 5);
    let settings = SettingsStore::get_or_init(&store).await.unwrap();
    assert_eq!(settings.next_invoice_number, 2);
    assert!(ActivityLogStore::list(&store).await.unwrap().is_empty());
}
