// src/db/invoice_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::InvoiceStore,
    models::invoice::{Invoice, InvoiceItem},
};

#[derive(Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_items(&self, mut invoices: Vec<Invoice>) -> Result<Vec<Invoice>, AppError> {
        for invoice in &mut invoices {
            invoice.items = sqlx::query_as::<_, InvoiceItem>(
                "SELECT * FROM invoice_items WHERE invoice_id = $1 ORDER BY line_no ASC",
            )
            .bind(invoice.id)
            .fetch_all(&self.pool)
            .await?;
        }
        Ok(invoices)
    }
}

#[async_trait]
impl InvoiceStore for InvoiceRepository {
    async fn list(&self) -> Result<Vec<Invoice>, AppError> {
        let invoices =
            sqlx::query_as::<_, Invoice>("SELECT * FROM invoices ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        self.attach_items(invoices).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Invoice>, AppError> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match invoice {
            Some(invoice) => Ok(self.attach_items(vec![invoice]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn search_by_customer(&self, fragment: &str) -> Result<Vec<Invoice>, AppError> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT * FROM invoices
            WHERE customer_name ILIKE '%' || $1 || '%'
            ORDER BY created_at DESC
            "#,
        )
        .bind(fragment)
        .fetch_all(&self.pool)
        .await?;
        self.attach_items(invoices).await
    }

    async fn persist(&self, invoice: &Invoice) -> Result<(), AppError> {
        // The aggregate commits as one transaction: header upsert, then the
        // item set replaced wholesale.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, client_id, customer_name, invoice_date, due_date,
                subtotal, tax_rate, tax_amount, discount, total_amount,
                notes, payment_terms, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (id) DO UPDATE SET
                client_id = EXCLUDED.client_id,
                customer_name = EXCLUDED.customer_name,
                invoice_date = EXCLUDED.invoice_date,
                due_date = EXCLUDED.due_date,
                subtotal = EXCLUDED.subtotal,
                tax_rate = EXCLUDED.tax_rate,
                tax_amount = EXCLUDED.tax_amount,
                discount = EXCLUDED.discount,
                total_amount = EXCLUDED.total_amount,
                notes = EXCLUDED.notes,
                payment_terms = EXCLUDED.payment_terms,
                status = EXCLUDED.status
            "#,
        )
        .bind(invoice.id)
        .bind(&invoice.invoice_number)
        .bind(invoice.client_id)
        .bind(&invoice.customer_name)
        .bind(invoice.invoice_date)
        .bind(invoice.due_date)
        .bind(invoice.subtotal)
        .bind(invoice.tax_rate)
        .bind(invoice.tax_amount)
        .bind(invoice.discount)
        .bind(invoice.total_amount)
        .bind(&invoice.notes)
        .bind(&invoice.payment_terms)
        .bind(invoice.status)
        .bind(invoice.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                // The allocator should make this impossible; surface it as a
                // conflict if the store reports one anyway.
                if db_err.is_unique_violation() {
                    return AppError::Conflict(format!(
                        "invoice number {} already exists",
                        invoice.invoice_number
                    ));
                }
            }
            e.into()
        })?;

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1")
            .bind(invoice.id)
            .execute(&mut *tx)
            .await?;

        for item in &invoice.items {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (
                    id, invoice_id, line_no, product_id, product_name,
                    quantity, unit_price, subtotal
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id)
            .bind(item.invoice_id)
            .bind(item.line_no)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.subtotal)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        // invoice_items cascade on delete.
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
