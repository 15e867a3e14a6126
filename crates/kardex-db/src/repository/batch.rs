//! # Batch Repository
//!
//! Read side of batches ("lotes") and their serial units. Batches are
//! written only by [`crate::StockLedger`].

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kardex_core::{Batch, SerialStatus, SerialUnit};

pub(crate) const BATCH_SELECT: &str = r#"
    SELECT
        b.id,
        b.product_id,
        p.name AS product_name,
        p.tracks_serials,
        b.entry_date,
        b.expiry_date,
        b.initial_quantity,
        b.current_quantity,
        b.notes,
        b.created_by
    FROM batches b
    JOIN products p ON p.id = b.product_id
"#;

/// Repository for batch reads.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    /// Lists every batch, newest entry first.
    pub async fn list(&self) -> DbResult<Vec<Batch>> {
        let sql = format!("{BATCH_SELECT} ORDER BY b.entry_date DESC, b.id DESC");

        let batches = sqlx::query_as::<_, Batch>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = batches.len(), "Listed batches");
        Ok(batches)
    }

    /// Lists batches that carry an expiry date, soonest first.
    pub async fn list_with_expiry(&self) -> DbResult<Vec<Batch>> {
        let sql = format!(
            "{BATCH_SELECT} WHERE b.expiry_date IS NOT NULL ORDER BY b.expiry_date, b.id"
        );

        let batches = sqlx::query_as::<_, Batch>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(batches)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Batch>> {
        let sql = format!("{BATCH_SELECT} WHERE b.id = ?");

        let batch = sqlx::query_as::<_, Batch>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(batch)
    }

    /// Lists the serial units of a batch, optionally filtered by status.
    ///
    /// ## Errors
    /// - `NotFound` if the batch doesn't exist
    pub async fn serial_numbers(
        &self,
        batch_id: i64,
        status: Option<SerialStatus>,
    ) -> DbResult<Vec<SerialUnit>> {
        if self.get_by_id(batch_id).await?.is_none() {
            return Err(DbError::not_found("Batch", batch_id));
        }

        let units = sqlx::query_as::<_, SerialUnit>(
            r#"
            SELECT code, batch_id, product_id, status
            FROM serial_units
            WHERE batch_id = ? AND (? IS NULL OR status = ?)
            ORDER BY code
            "#,
        )
        .bind(batch_id)
        .bind(status)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        debug!(batch_id, count = units.len(), "Listed serial units");
        Ok(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_category, seed_product, seed_user, test_db};
    use chrono::NaiveDate;
    use kardex_core::{MovementKind, NewBatch, NewMovement, Role};

    #[tokio::test]
    async fn test_serial_numbers_filter_by_status() {
        let db = test_db().await;
        let user_id = seed_user(&db, "ana", Role::Operator).await;
        let category_id = seed_category(&db, "Equipo").await;
        let product_id = seed_product(&db, category_id, true).await;

        let batch_id = db
            .ledger()
            .register_batch(
                &NewBatch {
                    product_id,
                    quantity: 3,
                    entry_date: None,
                    expiry_date: NaiveDate::from_ymd_opt(2030, 1, 31),
                    notes: None,
                    serial_codes: vec!["A1".into(), "A2".into(), "A3".into()],
                },
                user_id,
            )
            .await
            .unwrap();

        db.ledger()
            .register_movement(
                &NewMovement {
                    batch_id,
                    kind: MovementKind::Salida,
                    quantity: 1,
                    notes: None,
                    serial_code: Some("A2".into()),
                },
                user_id,
            )
            .await
            .unwrap();

        let batches = db.batches();
        let all = batches.serial_numbers(batch_id, None).await.unwrap();
        assert_eq!(all.len(), 3);

        let active = batches
            .serial_numbers(batch_id, Some(SerialStatus::Active))
            .await
            .unwrap();
        let codes: Vec<&str> = active.iter().map(|u| u.code.as_str()).collect();
        assert_eq!(codes, vec!["A1", "A3"]);

        let inactive = batches
            .serial_numbers(batch_id, Some(SerialStatus::Inactive))
            .await
            .unwrap();
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].code, "A2");

        let batch = batches.get_by_id(batch_id).await.unwrap().unwrap();
        assert_eq!(batch.current_quantity, 2);
        assert_eq!(batch.expiry_date, NaiveDate::from_ymd_opt(2030, 1, 31));
        assert!(batch.tracks_serials);

        assert_eq!(batches.list_with_expiry().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_serial_numbers_of_unknown_batch_is_not_found() {
        let db = test_db().await;
        let err = db.batches().serial_numbers(5, None).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
