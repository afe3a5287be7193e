// src/db/mod.rs
//
// Storage seams for the pipeline. The repositories in this module implement
// them against PostgreSQL; `memory::MemoryStore` implements them in-process
// for the test suite. The persistent store is the single source of truth:
// nothing above this layer caches stock or counters across requests, and the
// read-modify-write operations (reserve/release, allocate) are single
// serializable units inside each implementation.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        activity::ActivityLog,
        client::{Client, ClientInput},
        invoice::Invoice,
        product::{Product, ProductInput},
        settings::{CompanySettings, SettingsInput},
    },
};

pub mod activity_repo;
pub mod client_repo;
pub mod invoice_repo;
pub mod memory;
pub mod product_repo;
pub mod settings_repo;

pub use activity_repo::ActivityLogRepository;
pub use client_repo::ClientRepository;
pub use invoice_repo::InvoiceRepository;
pub use memory::MemoryStore;
pub use product_repo::ProductRepository;
pub use settings_repo::SettingsRepository;

/// Product directory plus the inventory ledger.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Product>, AppError>;
    async fn get(&self, id: Uuid) -> Result<Option<Product>, AppError>;
    async fn insert(&self, input: ProductInput) -> Result<Product, AppError>;
    async fn update(&self, id: Uuid, input: ProductInput) -> Result<Option<Product>, AppError>;
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
    async fn list_by_category(&self, category: &str) -> Result<Vec<Product>, AppError>;
    async fn search_by_name(&self, fragment: &str) -> Result<Vec<Product>, AppError>;
    async fn list_low_stock(&self, threshold: i32) -> Result<Vec<Product>, AppError>;

    /// Atomically check `stock >= quantity` and decrement, or fail with
    /// `InsufficientStock` without side effects. Two concurrent reservations
    /// for the last unit must not both succeed.
    async fn reserve(&self, id: Uuid, quantity: i32) -> Result<Product, AppError>;

    /// Atomically increment stock; the undo of a prior reservation. Never
    /// fails for a non-negative quantity on an existing product.
    async fn release(&self, id: Uuid, quantity: i32) -> Result<Product, AppError>;
}

/// Invoice aggregate store: an invoice and its items are written and read as
/// one unit.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Invoice>, AppError>;
    async fn get(&self, id: Uuid) -> Result<Option<Invoice>, AppError>;
    async fn search_by_customer(&self, fragment: &str) -> Result<Vec<Invoice>, AppError>;

    /// Upsert the aggregate: the persisted item set becomes exactly
    /// `invoice.items`. A duplicate invoice number surfaces as `Conflict`.
    async fn persist(&self, invoice: &Invoice) -> Result<(), AppError>;

    /// Remove the invoice and its items. Returns false when absent.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

/// Company settings singleton, which also backs the sequence allocator.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch the settings row, creating it with defaults on first use
    /// (prefix "FACT", counter 1, tax rate 20.0).
    async fn get_or_init(&self) -> Result<CompanySettings, AppError>;

    async fn update(&self, input: SettingsInput) -> Result<CompanySettings, AppError>;

    /// Atomic read-format-increment of the numbering counter. Serializable
    /// across concurrent callers: no two calls return the same number, and
    /// numbers are never reused.
    async fn allocate_invoice_number(&self) -> Result<String, AppError>;
}

/// Append-only audit sink.
#[async_trait]
pub trait ActivityLogStore: Send + Sync {
    async fn append(&self, entry: &ActivityLog) -> Result<(), AppError>;

    /// Newest first.
    async fn list(&self) -> Result<Vec<ActivityLog>, AppError>;
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Client>, AppError>;
    async fn get(&self, id: Uuid) -> Result<Option<Client>, AppError>;
    async fn insert(&self, input: ClientInput) -> Result<Client, AppError>;
    async fn update(&self, id: Uuid, input: ClientInput) -> Result<Option<Client>, AppError>;
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

/// Formats an allocated counter value, e.g. "FACT-0042".
pub fn format_invoice_number(prefix: &str, number: i32) -> String {
    format!("{prefix}-{number:04}")
}
