// src/db/product_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ProductStore,
    models::product::{Product, ProductInput},
};

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for ProductRepository {
    async fn list(&self) -> Result<Vec<Product>, AppError> {
        let products =
            sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(products)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn insert(&self, input: ProductInput) -> Result<Product, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, description, price, stock_quantity, category)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.stock_quantity)
        .bind(&input.category)
        .fetch_one(&self.pool)
        .await?;
        Ok(product)
    }

    async fn update(&self, id: Uuid, input: ProductInput) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = $2, description = $3, price = $4, stock_quantity = $5, category = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.stock_quantity)
        .bind(&input.category)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_category(&self, category: &str) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE category = $1 ORDER BY name ASC",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn search_by_name(&self, fragment: &str) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE name ILIKE '%' || $1 || '%' ORDER BY name ASC",
        )
        .bind(fragment)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn list_low_stock(&self, threshold: i32) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE stock_quantity < $1 ORDER BY stock_quantity ASC",
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn reserve(&self, id: Uuid, quantity: i32) -> Result<Product, AppError> {
        // Check-and-decrement in one statement. Concurrent callers serialize
        // on the row lock, so the last unit can only be taken once.
        let updated = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity - $2
            WHERE id = $1 AND stock_quantity >= $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(product) => Ok(product),
            // No row matched: either the product is gone or stock ran short.
            None => match self.get(id).await? {
                Some(product) => Err(AppError::InsufficientStock {
                    product_id: id,
                    available: product.stock_quantity,
                    requested: quantity,
                }),
                None => Err(AppError::ProductNotFound(id)),
            },
        }
    }

    async fn release(&self, id: Uuid, quantity: i32) -> Result<Product, AppError> {
        let updated = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or(AppError::ProductNotFound(id))
    }
}
