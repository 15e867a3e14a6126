//! # Category Repository
//!
//! Categories are never deleted. "Delete" flips the status to `Inactivo`,
//! which also frees the name: uniqueness is enforced only among active
//! categories (partial unique index `idx_categories_active_name`).

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use kardex_core::{Category, CategoryUpdate, NewCategory, RecordStatus};

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Lists active categories, ordered by name.
    pub async fn list_active(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, description, status
            FROM categories
            WHERE status = ?
            ORDER BY name
            "#,
        )
        .bind(RecordStatus::Active)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = categories.len(), "Listed active categories");
        Ok(categories)
    }

    /// Lists every category regardless of status.
    pub async fn list_all(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, status FROM categories ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, status FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Creates an active category and returns its id.
    ///
    /// ## Errors
    /// - `UniqueViolation` if an active category already has the name
    pub async fn insert(&self, category: &NewCategory) -> DbResult<i64> {
        let id = sqlx::query("INSERT INTO categories (name, description, status) VALUES (?, ?, ?)")
            .bind(&category.name)
            .bind(&category.description)
            .bind(RecordStatus::Active)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::from(e).with_duplicate_value(&category.name))?
            .last_insert_rowid();

        info!(category_id = id, name = %category.name, "Category created");
        Ok(id)
    }

    /// Updates name and description; the status only when one is given.
    ///
    /// ## Errors
    /// - `NotFound` if the category doesn't exist
    /// - `UniqueViolation` if the result would clash with an active name
    pub async fn update(&self, id: i64, update: &CategoryUpdate) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE categories
            SET name = ?, description = ?, status = COALESCE(?, status)
            WHERE id = ?
            "#,
        )
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.status)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&update.name))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        info!(category_id = id, "Category updated");
        Ok(())
    }

    /// Soft-deletes a category by marking it inactive. Idempotent.
    pub async fn disable(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("UPDATE categories SET status = ? WHERE id = ?")
            .bind(RecordStatus::Inactive)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        info!(category_id = id, "Category disabled");
        Ok(())
    }
}
