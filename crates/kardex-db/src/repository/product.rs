//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Listing with the category name joined in
//! - Create and update (no delete: batches and movements reference products)
//!
//! Stock is not a product column. It is the sum of `current_quantity` over
//! the product's batches, see [`super::dashboard`].

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use kardex_core::{NewProduct, Product};

const PRODUCT_SELECT: &str = r#"
    SELECT
        p.id,
        p.name,
        p.description,
        p.category_id,
        c.name AS category_name,
        p.stock_min,
        p.stock_max,
        p.tracks_serials
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let id = repo.insert(&new_product).await?;
/// let product = repo.get_by_id(id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists every product, ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let sql = format!("{PRODUCT_SELECT} ORDER BY p.name, p.id");

        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Gets a product by id.
    ///
    /// ## Returns
    /// - `Ok(Some(product))` if found
    /// - `Ok(None)` if not found
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.id = ?");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Creates a product and returns its id.
    ///
    /// ## Errors
    /// - `NotFound` if the category doesn't exist
    pub async fn insert(&self, product: &NewProduct) -> DbResult<i64> {
        self.ensure_category(product.category_id).await?;

        let id = sqlx::query(
            r#"
            INSERT INTO products
                (name, description, category_id, stock_min, stock_max, tracks_serials)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category_id)
        .bind(product.stock_min)
        .bind(product.stock_max)
        .bind(product.tracks_serials)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        info!(product_id = id, name = %product.name, "Product created");
        Ok(id)
    }

    /// Replaces every editable field of a product.
    ///
    /// ## Errors
    /// - `NotFound` if the product or the category doesn't exist
    /// - `Conflict` if serial tracking would change on a product that
    ///   already has batches (their serial units would stop adding up)
    pub async fn update(&self, id: i64, product: &NewProduct) -> DbResult<()> {
        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        self.ensure_category(product.category_id).await?;

        if current.tracks_serials != product.tracks_serials && self.has_batches(id).await? {
            return Err(DbError::Conflict(format!(
                "product {id} already has batches; serial tracking can't change"
            )));
        }

        sqlx::query(
            r#"
            UPDATE products
            SET name = ?, description = ?, category_id = ?,
                stock_min = ?, stock_max = ?, tracks_serials = ?
            WHERE id = ?
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category_id)
        .bind(product.stock_min)
        .bind(product.stock_max)
        .bind(product.tracks_serials)
        .bind(id)
        .execute(&self.pool)
        .await?;

        info!(product_id = id, "Product updated");
        Ok(())
    }

    async fn ensure_category(&self, category_id: i64) -> DbResult<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await?;

        exists
            .map(|_| ())
            .ok_or_else(|| DbError::not_found("Category", category_id))
    }

    async fn has_batches(&self, product_id: i64) -> DbResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM batches WHERE product_id = ? LIMIT 1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(found.is_some())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
