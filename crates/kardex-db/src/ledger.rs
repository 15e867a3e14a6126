//! # Stock Ledger
//!
//! Executes batch registrations and movements atomically.
//!
//! ## Movement Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    take write lock          (first statement is a write, so every read  │
//! │                              below sees the latest committed state)     │
//! │    read stock stop                                                      │
//! │    read batch + product     ──► NotFound                                │
//! │    read serial unit                                                     │
//! │    plan_movement(...)       ──► LedgerError (nothing written)           │
//! │    UPDATE batches ... WHERE current + delta BETWEEN 0 AND initial       │
//! │    UPDATE serial_units ... WHERE status = expected                      │
//! │    INSERT movement                                                      │
//! │  COMMIT                     (any error before this: ROLLBACK on drop)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The guarded updates re-check the plan in SQL. If one matches no row the
//! transaction aborts with [`DbError::Conflict`].

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::settings::read_stock_stop;
use crate::repository::sql_timestamp;
use kardex_core::ledger::{plan_batch_registration, plan_movement, BatchState, ProductState};
use kardex_core::{LedgerError, NewBatch, NewMovement, SerialStatus, SerialUnit, STOCK_STOP_KEY};

/// Transactional executor for stock-changing writes.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    /// Registers a batch and all of its serial units. Returns the batch id.
    ///
    /// ## Errors
    /// - `Ledger(StockStopActive)` while the stock stop is on
    /// - `NotFound` for an unknown product
    /// - `Ledger(SerialCountMismatch | SerialsNotTracked)`
    /// - `UniqueViolation` if any serial code already exists; no batch row
    ///   is left behind
    pub async fn register_batch(&self, batch: &NewBatch, user_id: i64) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;
        acquire_write_lock(&mut tx).await?;

        let stop = read_stock_stop(&mut tx).await?;
        if stop.is_active() {
            return Err(LedgerError::StockStopActive.into());
        }

        let product = sqlx::query_as::<_, (i64, bool)>(
            "SELECT id, tracks_serials FROM products WHERE id = ?",
        )
        .bind(batch.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(|(product_id, tracks_serials)| ProductState {
            product_id,
            tracks_serials,
        })
        .ok_or_else(|| DbError::not_found("Product", batch.product_id))?;

        let plan = plan_batch_registration(stop, &product, batch)?;
        let entry_date = batch.entry_date.unwrap_or_else(Utc::now);

        let batch_id = sqlx::query(
            r#"
            INSERT INTO batches
                (product_id, entry_date, expiry_date, initial_quantity,
                 current_quantity, notes, created_by)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(plan.product_id)
        .bind(sql_timestamp(entry_date))
        .bind(batch.expiry_date)
        .bind(plan.initial_quantity)
        .bind(plan.current_quantity)
        .bind(&batch.notes)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for code in &plan.serial_codes {
            sqlx::query(
                "INSERT INTO serial_units (code, batch_id, product_id, status) VALUES (?, ?, ?, ?)",
            )
            .bind(code)
            .bind(batch_id)
            .bind(plan.product_id)
            .bind(SerialStatus::Active)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::from(e).with_duplicate_value(code))?;
        }

        tx.commit().await?;

        info!(
            batch_id,
            product_id = plan.product_id,
            quantity = plan.initial_quantity,
            serials = plan.serial_codes.len(),
            user_id,
            "Batch registered"
        );
        Ok(batch_id)
    }

    /// Applies a movement to a batch. Returns the movement id.
    ///
    /// ## Errors
    /// - `Ledger(_)` when a stock rule rejects the movement
    /// - `NotFound` for an unknown batch
    /// - `Conflict` when a concurrent writer changed the batch or unit
    pub async fn register_movement(&self, movement: &NewMovement, user_id: i64) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;
        acquire_write_lock(&mut tx).await?;

        let stop = read_stock_stop(&mut tx).await?;
        if stop.is_active() {
            return Err(LedgerError::StockStopActive.into());
        }

        let batch = sqlx::query_as::<_, (i64, i64, bool, i64, i64)>(
            r#"
            SELECT b.id, b.product_id, p.tracks_serials, b.initial_quantity, b.current_quantity
            FROM batches b
            JOIN products p ON p.id = b.product_id
            WHERE b.id = ?
            "#,
        )
        .bind(movement.batch_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(
            |(batch_id, product_id, tracks_serials, initial_quantity, current_quantity)| {
                BatchState {
                    batch_id,
                    product_id,
                    tracks_serials,
                    initial_quantity,
                    current_quantity,
                }
            },
        )
        .ok_or_else(|| DbError::not_found("Batch", movement.batch_id))?;

        let serial = match &movement.serial_code {
            Some(code) => {
                sqlx::query_as::<_, SerialUnit>(
                    "SELECT code, batch_id, product_id, status FROM serial_units WHERE code = ?",
                )
                .bind(code)
                .fetch_optional(&mut *tx)
                .await?
            }
            None => None,
        };

        let plan = plan_movement(stop, &batch, movement, serial.as_ref())?;
        debug!(
            batch_id = plan.batch_id,
            delta = plan.delta,
            resulting = plan.resulting_quantity,
            "Movement planned"
        );

        let updated = sqlx::query(
            r#"
            UPDATE batches
            SET current_quantity = current_quantity + ?
            WHERE id = ?
              AND current_quantity + ? >= 0
              AND current_quantity + ? <= initial_quantity
            "#,
        )
        .bind(plan.delta)
        .bind(plan.batch_id)
        .bind(plan.delta)
        .bind(plan.delta)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            warn!(batch_id = plan.batch_id, "Batch quantity changed underneath movement");
            return Err(DbError::Conflict(format!(
                "batch {} changed while the movement was being registered",
                plan.batch_id
            )));
        }

        if let Some(transition) = &plan.serial {
            let flipped = sqlx::query(
                "UPDATE serial_units SET status = ? WHERE code = ? AND batch_id = ? AND status = ?",
            )
            .bind(transition.to)
            .bind(&transition.code)
            .bind(plan.batch_id)
            .bind(transition.from)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if flipped == 0 {
                warn!(code = %transition.code, "Serial unit changed underneath movement");
                return Err(DbError::Conflict(format!(
                    "serial number {} changed while the movement was being registered",
                    transition.code
                )));
            }
        }

        let movement_id = sqlx::query(
            r#"
            INSERT INTO movements (batch_id, kind, quantity, notes, user_id, serial_code, moved_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(plan.batch_id)
        .bind(plan.kind)
        .bind(plan.quantity)
        .bind(&movement.notes)
        .bind(user_id)
        .bind(plan.serial.as_ref().map(|t| t.code.as_str()))
        .bind(sql_timestamp(Utc::now()))
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;

        info!(
            movement_id,
            batch_id = plan.batch_id,
            kind = %plan.kind,
            quantity = plan.quantity,
            current = plan.resulting_quantity,
            user_id,
            "Movement registered"
        );
        Ok(movement_id)
    }
}

/// Makes the transaction's first statement a write.
///
/// SQLite starts a deferred transaction as a reader; upgrading it after
/// another connection committed fails. Writing first queues this
/// transaction behind any other writer instead.
async fn acquire_write_lock(tx: &mut Transaction<'_, Sqlite>) -> DbResult<()> {
    sqlx::query("UPDATE settings SET value = value WHERE key = ?")
        .bind(STOCK_STOP_KEY)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_category, seed_product, seed_user, test_db};
    use crate::Database;
    use kardex_core::{MovementKind, StockStop};

    struct Fixture {
        db: Database,
        user_id: i64,
        plain: i64,
        serialized: i64,
    }

    async fn fixture() -> Fixture {
        let db = test_db().await;
        let user_id = seed_user(&db, "ana", kardex_core::Role::Operator).await;
        let category_id = seed_category(&db, "Insumos").await;
        let plain = seed_product(&db, category_id, false).await;
        let serialized = seed_product(&db, category_id, true).await;
        Fixture {
            db,
            user_id,
            plain,
            serialized,
        }
    }

    fn batch(product_id: i64, quantity: i64, serial_codes: &[&str]) -> NewBatch {
        NewBatch {
            product_id,
            quantity,
            entry_date: None,
            expiry_date: None,
            notes: None,
            serial_codes: serial_codes.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn movement(batch_id: i64, kind: MovementKind, quantity: i64, serial: Option<&str>) -> NewMovement {
        NewMovement {
            batch_id,
            kind,
            quantity,
            notes: None,
            serial_code: serial.map(str::to_string),
        }
    }

    async fn current_quantity(db: &Database, batch_id: i64) -> i64 {
        db.batches()
            .get_by_id(batch_id)
            .await
            .unwrap()
            .unwrap()
            .current_quantity
    }

    async fn count(db: &Database, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_non_serialized_round_trip() {
        let f = fixture().await;
        let ledger = f.db.ledger();
        let batch_id = ledger
            .register_batch(&batch(f.plain, 10, &[]), f.user_id)
            .await
            .unwrap();

        ledger
            .register_movement(&movement(batch_id, MovementKind::Salida, 7, None), f.user_id)
            .await
            .unwrap();
        assert_eq!(current_quantity(&f.db, batch_id).await, 3);

        let err = ledger
            .register_movement(&movement(batch_id, MovementKind::Salida, 4, None), f.user_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Ledger(LedgerError::ExceedsCurrent {
                requested: 4,
                available: 3
            })
        ));

        // 7 units left: a return of 8 does not fit, a return of 5 does.
        let err = ledger
            .register_movement(&movement(batch_id, MovementKind::Entrada, 8, None), f.user_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Ledger(LedgerError::ExceedsDispensed { .. })
        ));

        ledger
            .register_movement(&movement(batch_id, MovementKind::Entrada, 5, None), f.user_id)
            .await
            .unwrap();
        assert_eq!(current_quantity(&f.db, batch_id).await, 8);
        assert_eq!(count(&f.db, "movements").await, 2);
    }

    #[tokio::test]
    async fn test_serialized_round_trip() {
        let f = fixture().await;
        let ledger = f.db.ledger();
        let batch_id = ledger
            .register_batch(&batch(f.serialized, 2, &["A1", "A2"]), f.user_id)
            .await
            .unwrap();

        ledger
            .register_movement(
                &movement(batch_id, MovementKind::Salida, 1, Some("A1")),
                f.user_id,
            )
            .await
            .unwrap();

        let err = ledger
            .register_movement(
                &movement(batch_id, MovementKind::Salida, 1, Some("A1")),
                f.user_id,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Ledger(LedgerError::SerialUnavailable { .. })
        ));

        ledger
            .register_movement(
                &movement(batch_id, MovementKind::Entrada, 1, Some("A1")),
                f.user_id,
            )
            .await
            .unwrap();

        let active = f
            .db
            .batches()
            .serial_numbers(batch_id, Some(SerialStatus::Active))
            .await
            .unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(current_quantity(&f.db, batch_id).await, 2);

        let movements = f.db.movements().list().await.unwrap();
        assert!(movements
            .iter()
            .all(|m| m.serial_code.as_deref() == Some("A1")));
    }

    #[tokio::test]
    async fn test_serial_count_mismatch_writes_nothing() {
        let f = fixture().await;
        let err = f
            .db
            .ledger()
            .register_batch(&batch(f.serialized, 3, &["A1", "A2"]), f.user_id)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Ledger(LedgerError::SerialCountMismatch {
                expected: 3,
                received: 2
            })
        ));
        assert_eq!(count(&f.db, "batches").await, 0);
        assert_eq!(count(&f.db, "serial_units").await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_serial_rolls_back_whole_batch() {
        let f = fixture().await;
        let ledger = f.db.ledger();
        ledger
            .register_batch(&batch(f.serialized, 1, &["A1"]), f.user_id)
            .await
            .unwrap();

        let err = ledger
            .register_batch(&batch(f.serialized, 2, &["B1", "A1"]), f.user_id)
            .await
            .unwrap_err();

        match err {
            DbError::UniqueViolation { value, .. } => assert_eq!(value, "A1"),
            other => panic!("expected UniqueViolation, got {other:?}"),
        }
        assert_eq!(count(&f.db, "batches").await, 1);
        assert_eq!(count(&f.db, "serial_units").await, 1);
    }

    #[tokio::test]
    async fn test_stock_stop_blocks_both_operations() {
        let f = fixture().await;
        let ledger = f.db.ledger();
        let batch_id = ledger
            .register_batch(&batch(f.plain, 5, &[]), f.user_id)
            .await
            .unwrap();

        f.db.settings().set_stock_stop(StockStop::Active).await.unwrap();

        let err = ledger
            .register_batch(&batch(f.plain, 5, &[]), f.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Ledger(LedgerError::StockStopActive)));

        let err = ledger
            .register_movement(&movement(batch_id, MovementKind::Salida, 1, None), f.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Ledger(LedgerError::StockStopActive)));

        f.db.settings().set_stock_stop(StockStop::Inactive).await.unwrap();
        ledger
            .register_movement(&movement(batch_id, MovementKind::Salida, 1, None), f.user_id)
            .await
            .unwrap();
        assert_eq!(current_quantity(&f.db, batch_id).await, 4);
    }

    #[tokio::test]
    async fn test_unknown_references_are_not_found() {
        let f = fixture().await;
        let ledger = f.db.ledger();

        let err = ledger
            .register_batch(&batch(404, 5, &[]), f.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let err = ledger
            .register_movement(&movement(404, MovementKind::Salida, 1, None), f.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_serial_on_plain_product_is_rejected() {
        let f = fixture().await;
        let ledger = f.db.ledger();

        let err = ledger
            .register_batch(&batch(f.plain, 1, &["X1"]), f.user_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Ledger(LedgerError::SerialsNotTracked { .. })
        ));

        let batch_id = ledger
            .register_batch(&batch(f.plain, 1, &[]), f.user_id)
            .await
            .unwrap();
        let err = ledger
            .register_movement(
                &movement(batch_id, MovementKind::Salida, 1, Some("X1")),
                f.user_id,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Ledger(LedgerError::SerialsNotTracked { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_salidas_never_oversell() {
        let dir = std::env::temp_dir().join(format!(
            "kardex-ledger-{}-{}",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let db = Database::new(crate::DbConfig::new(dir.join("kardex.db")).max_connections(4))
            .await
            .unwrap();

        let user_id = seed_user(&db, "ana", kardex_core::Role::Operator).await;
        let category_id = seed_category(&db, "Insumos").await;
        let product_id = seed_product(&db, category_id, false).await;
        let batch_id = db
            .ledger()
            .register_batch(&batch(product_id, 3, &[]), user_id)
            .await
            .unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let ledger = db.ledger();
                tokio::spawn(async move {
                    ledger
                        .register_movement(&movement(batch_id, MovementKind::Salida, 1, None), user_id)
                        .await
                })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 3);
        assert_eq!(current_quantity(&db, batch_id).await, 0);

        db.close().await;
        let _ = std::fs::remove_dir_all(&dir);
    }
}
