// src/db/memory.rs
//
// In-memory implementation of the storage seams. It is the backing store of
// the test suite; one mutex over the whole state makes every read-modify-write
// operation a single serializable unit, which is the same contract the
// PostgreSQL repositories get from per-row locking.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        ActivityLogStore, ClientStore, InvoiceStore, ProductStore, SettingsStore,
        format_invoice_number,
    },
    models::{
        activity::ActivityLog,
        client::{Client, ClientInput},
        invoice::Invoice,
        product::{Product, ProductInput},
        settings::{CompanySettings, SettingsInput},
    },
};

#[derive(Default)]
struct MemoryInner {
    products: HashMap<Uuid, Product>,
    clients: HashMap<Uuid, Client>,
    invoices: HashMap<Uuid, Invoice>,
    settings: Option<CompanySettings>,
    logs: Vec<ActivityLog>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        // A poisoned lock only happens after a panic in a holder; tests are
        // allowed to die loudly here.
        self.inner.lock().expect("memory store lock poisoned")
    }
}

fn default_settings() -> CompanySettings {
    let now = Utc::now();
    CompanySettings {
        id: Uuid::new_v4(),
        company_name: "My Company".to_string(),
        address: None,
        city: None,
        postal_code: None,
        country: None,
        phone: None,
        email: None,
        website: None,
        tax_number: None,
        bank_account: None,
        invoice_prefix: "FACT".to_string(),
        next_invoice_number: 1,
        default_tax_rate: Decimal::new(200, 1),
        currency: "EUR".to_string(),
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Product>, AppError> {
        let mut products: Vec<Product> = self.lock().products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        Ok(self.lock().products.get(&id).cloned())
    }

    async fn insert(&self, input: ProductInput) -> Result<Product, AppError> {
        let product = Product {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            price: input.price,
            stock_quantity: input.stock_quantity,
            category: input.category,
            created_at: Utc::now(),
        };
        self.lock().products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(&self, id: Uuid, input: ProductInput) -> Result<Option<Product>, AppError> {
        let mut inner = self.lock();
        match inner.products.get_mut(&id) {
            Some(product) => {
                product.name = input.name;
                product.description = input.description;
                product.price = input.price;
                product.stock_quantity = input.stock_quantity;
                product.category = input.category;
                Ok(Some(product.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.lock().products.remove(&id).is_some())
    }

    async fn list_by_category(&self, category: &str) -> Result<Vec<Product>, AppError> {
        let mut products: Vec<Product> = self
            .lock()
            .products
            .values()
            .filter(|p| p.category.as_deref() == Some(category))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn search_by_name(&self, fragment: &str) -> Result<Vec<Product>, AppError> {
        let needle = fragment.to_lowercase();
        let mut products: Vec<Product> = self
            .lock()
            .products
            .values()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn list_low_stock(&self, threshold: i32) -> Result<Vec<Product>, AppError> {
        let mut products: Vec<Product> = self
            .lock()
            .products
            .values()
            .filter(|p| p.stock_quantity < threshold)
            .cloned()
            .collect();
        products.sort_by_key(|p| p.stock_quantity);
        Ok(products)
    }

    async fn reserve(&self, id: Uuid, quantity: i32) -> Result<Product, AppError> {
        let mut inner = self.lock();
        let product = inner
            .products
            .get_mut(&id)
            .ok_or(AppError::ProductNotFound(id))?;
        if product.stock_quantity < quantity {
            return Err(AppError::InsufficientStock {
                product_id: id,
                available: product.stock_quantity,
                requested: quantity,
            });
        }
        product.stock_quantity -= quantity;
        Ok(product.clone())
    }

    async fn release(&self, id: Uuid, quantity: i32) -> Result<Product, AppError> {
        let mut inner = self.lock();
        let product = inner
            .products
            .get_mut(&id)
            .ok_or(AppError::ProductNotFound(id))?;
        product.stock_quantity += quantity;
        Ok(product.clone())
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Invoice>, AppError> {
        let mut invoices: Vec<Invoice> = self.lock().invoices.values().cloned().collect();
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invoices)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Invoice>, AppError> {
        Ok(self.lock().invoices.get(&id).cloned())
    }

    async fn search_by_customer(&self, fragment: &str) -> Result<Vec<Invoice>, AppError> {
        let needle = fragment.to_lowercase();
        let mut invoices: Vec<Invoice> = self
            .lock()
            .invoices
            .values()
            .filter(|i| i.customer_name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invoices)
    }

    async fn persist(&self, invoice: &Invoice) -> Result<(), AppError> {
        let mut inner = self.lock();
        let duplicate = inner
            .invoices
            .values()
            .any(|other| other.id != invoice.id && other.invoice_number == invoice.invoice_number);
        if duplicate {
            return Err(AppError::Conflict(format!(
                "invoice number {} already exists",
                invoice.invoice_number
            )));
        }
        inner.invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.lock().invoices.remove(&id).is_some())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get_or_init(&self) -> Result<CompanySettings, AppError> {
        let mut inner = self.lock();
        Ok(inner.settings.get_or_insert_with(default_settings).clone())
    }

    async fn update(&self, input: SettingsInput) -> Result<CompanySettings, AppError> {
        let mut inner = self.lock();
        let settings = inner.settings.get_or_insert_with(default_settings);
        settings.company_name = input.company_name;
        settings.address = input.address;
        settings.city = input.city;
        settings.postal_code = input.postal_code;
        settings.country = input.country;
        settings.phone = input.phone;
        settings.email = input.email;
        settings.website = input.website;
        settings.tax_number = input.tax_number;
        settings.bank_account = input.bank_account;
        settings.invoice_prefix = input.invoice_prefix;
        settings.next_invoice_number = input.next_invoice_number;
        settings.default_tax_rate = input.default_tax_rate;
        settings.currency = input.currency;
        settings.updated_at = Utc::now();
        Ok(settings.clone())
    }

    async fn allocate_invoice_number(&self) -> Result<String, AppError> {
        let mut inner = self.lock();
        let settings = inner.settings.get_or_insert_with(default_settings);
        let number = format_invoice_number(&settings.invoice_prefix, settings.next_invoice_number);
        settings.next_invoice_number += 1;
        settings.updated_at = Utc::now();
        Ok(number)
    }
}

#[async_trait]
impl ActivityLogStore for MemoryStore {
    async fn append(&self, entry: &ActivityLog) -> Result<(), AppError> {
        self.lock().logs.push(entry.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ActivityLog>, AppError> {
        let mut logs = self.lock().logs.clone();
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(logs)
    }
}

#[async_trait]
impl ClientStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Client>, AppError> {
        let mut clients: Vec<Client> = self.lock().clients.values().cloned().collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clients)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Client>, AppError> {
        Ok(self.lock().clients.get(&id).cloned())
    }

    async fn insert(&self, input: ClientInput) -> Result<Client, AppError> {
        let client = Client {
            id: Uuid::new_v4(),
            name: input.name,
            email: input.email,
            phone: input.phone,
            address: input.address,
            created_at: Utc::now(),
        };
        self.lock().clients.insert(client.id, client.clone());
        Ok(client)
    }

    async fn update(&self, id: Uuid, input: ClientInput) -> Result<Option<Client>, AppError> {
        let mut inner = self.lock();
        match inner.clients.get_mut(&id) {
            Some(client) => {
                client.name = input.name;
                client.email = input.email;
                client.phone = input.phone;
                client.address = input.address;
                Ok(Some(client.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.lock().clients.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_input(stock: i32) -> ProductInput {
        ProductInput {
            name: "Widget".to_string(),
            description: None,
            price: Decimal::new(1000, 2),
            stock_quantity: stock,
            category: None,
        }
    }

    #[tokio::test]
    async fn reserve_fails_without_side_effect_when_stock_is_short() {
        let store = MemoryStore::new();
        let product = ProductStore::insert(&store, product_input(2)).await.unwrap();

        let err = store.reserve(product.id, 3).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            }
        ));

        let unchanged = ProductStore::get(&store, product.id).await.unwrap().unwrap();
        assert_eq!(unchanged.stock_quantity, 2);
    }

    #[tokio::test]
    async fn allocator_initializes_and_formats() {
        let store = MemoryStore::new();
        assert_eq!(store.allocate_invoice_number().await.unwrap(), "FACT-0001");
        assert_eq!(store.allocate_invoice_number().await.unwrap(), "FACT-0002");
        let settings = store.get_or_init().await.unwrap();
        assert_eq!(settings.next_invoice_number, 3);
    }
}
