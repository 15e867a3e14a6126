//! # Movement Repository
//!
//! Read side of stock movements, including the per-product kardex.
//!
//! ## Kardex Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  batches  (product 7)              movements  (batches of product 7)   │
//! │  ─────────────────────             ─────────────────────────────────   │
//! │  #3  2024-05-01  +10   ──┐    ┌──  #11 2024-05-02  Salida   7          │
//! │                          │    │    #12 2024-05-03  Entrada  2          │
//! │                          ▼    ▼                                         │
//! │                    Vec<LedgerLine> (UNION ALL)                          │
//! │                          │                                              │
//! │                          ▼                                              │
//! │           kardex_core::kardex::build_report(range)                      │
//! │                          │                                              │
//! │                          ▼                                              │
//! │        opening 0 → +10 (10) → -7 (3) → +2 (5) = closing 5               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use super::sql_timestamp;
use crate::error::{DbError, DbResult};
use kardex_core::kardex::{build_report, opening_balance};
use kardex_core::{
    DailyProductMovement, DateRange, KardexReport, LedgerLine, LedgerSource, Movement,
    MovementKind,
};

const MOVEMENT_SELECT: &str = r#"
    SELECT
        m.id,
        m.batch_id,
        b.product_id,
        p.name AS product_name,
        m.kind,
        m.quantity,
        m.notes,
        m.user_id,
        u.login AS user_login,
        m.serial_code,
        m.moved_at
    FROM movements m
    JOIN batches b ON b.id = m.batch_id
    JOIN products p ON p.id = b.product_id
    LEFT JOIN users u ON u.id = m.user_id
"#;

#[derive(sqlx::FromRow)]
struct LedgerRow {
    source: String,
    reference_id: i64,
    batch_id: i64,
    at: DateTime<Utc>,
    kind: MovementKind,
    quantity: i64,
    serial_code: Option<String>,
    notes: Option<String>,
}

impl From<LedgerRow> for LedgerLine {
    fn from(row: LedgerRow) -> Self {
        LedgerLine {
            source: if row.source == "registration" {
                LedgerSource::BatchRegistration
            } else {
                LedgerSource::Movement
            },
            reference_id: row.reference_id,
            batch_id: row.batch_id,
            at: row.at,
            kind: row.kind,
            quantity: row.quantity,
            serial_code: row.serial_code,
            notes: row.notes,
        }
    }
}

/// Repository for movement reads.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Lists every movement, newest first.
    pub async fn list(&self) -> DbResult<Vec<Movement>> {
        let sql = format!("{MOVEMENT_SELECT} ORDER BY m.moved_at DESC, m.id DESC");

        let movements = sqlx::query_as::<_, Movement>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = movements.len(), "Listed movements");
        Ok(movements)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Movement>> {
        let sql = format!("{MOVEMENT_SELECT} WHERE m.id = ?");

        let movement = sqlx::query_as::<_, Movement>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(movement)
    }

    /// Every stock event of a product: one inbound line per batch
    /// registration plus one line per movement. Unordered.
    pub async fn ledger_lines(&self, product_id: i64) -> DbResult<Vec<LedgerLine>> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT
                'registration' AS source,
                b.id AS reference_id,
                b.id AS batch_id,
                b.entry_date AS at,
                'Entrada' AS kind,
                b.initial_quantity AS quantity,
                NULL AS serial_code,
                b.notes AS notes
            FROM batches b
            WHERE b.product_id = ?

            UNION ALL

            SELECT
                'movement',
                m.id,
                m.batch_id,
                m.moved_at,
                m.kind,
                m.quantity,
                m.serial_code,
                m.notes
            FROM movements m
            JOIN batches b ON b.id = m.batch_id
            WHERE b.product_id = ?
            "#,
        )
        .bind(product_id)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LedgerLine::from).collect())
    }

    /// Builds the kardex of a product over a range.
    ///
    /// ## Errors
    /// - `NotFound` if the product doesn't exist
    pub async fn kardex(&self, product_id: i64, range: &DateRange) -> DbResult<KardexReport> {
        self.ensure_product(product_id).await?;

        let lines = self.ledger_lines(product_id).await?;
        let report = build_report(product_id, lines, range);

        debug!(
            product_id,
            entries = report.entries.len(),
            closing = report.closing_balance,
            "Built kardex"
        );
        Ok(report)
    }

    /// Balance of a product before `start`. Without a start there is nothing
    /// before the range and the balance is 0.
    pub async fn opening_balance(
        &self,
        product_id: i64,
        start: Option<DateTime<Utc>>,
    ) -> DbResult<i64> {
        self.ensure_product(product_id).await?;

        let lines = self.ledger_lines(product_id).await?;
        Ok(opening_balance(&lines, start))
    }

    /// Per-day inbound and outbound movement totals of a product.
    pub async fn daily_for_product(
        &self,
        product_id: i64,
        range: &DateRange,
    ) -> DbResult<Vec<DailyProductMovement>> {
        self.ensure_product(product_id).await?;

        let start = range.start.map(sql_timestamp);
        let end = range.end.map(sql_timestamp);

        let days = sqlx::query_as::<_, DailyProductMovement>(
            r#"
            SELECT
                date(m.moved_at) AS day,
                COALESCE(SUM(CASE WHEN m.kind = 'Entrada' THEN m.quantity ELSE 0 END), 0) AS inbound,
                COALESCE(SUM(CASE WHEN m.kind = 'Salida' THEN m.quantity ELSE 0 END), 0) AS outbound
            FROM movements m
            JOIN batches b ON b.id = m.batch_id
            WHERE b.product_id = ?
              AND (? IS NULL OR m.moved_at >= ?)
              AND (? IS NULL OR m.moved_at <= ?)
            GROUP BY date(m.moved_at)
            ORDER BY day
            "#,
        )
        .bind(product_id)
        .bind(&start)
        .bind(&start)
        .bind(&end)
        .bind(&end)
        .fetch_all(&self.pool)
        .await?;

        Ok(days)
    }

    async fn ensure_product(&self, product_id: i64) -> DbResult<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        exists
            .map(|_| ())
            .ok_or_else(|| DbError::not_found("Product", product_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_category, seed_product, seed_user, test_db};
    use crate::Database;
    use chrono::{Duration, TimeZone};
    use kardex_core::{NewBatch, NewMovement, Role};

    async fn batch_of_ten(db: &Database, user_id: i64, product_id: i64) -> i64 {
        db.ledger()
            .register_batch(
                &NewBatch {
                    product_id,
                    quantity: 10,
                    entry_date: Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()),
                    expiry_date: None,
                    notes: Some("compra".into()),
                    serial_codes: vec![],
                },
                user_id,
            )
            .await
            .unwrap()
    }

    async fn move_units(db: &Database, user_id: i64, batch_id: i64, kind: MovementKind, quantity: i64) {
        db.ledger()
            .register_movement(
                &NewMovement {
                    batch_id,
                    kind,
                    quantity,
                    notes: None,
                    serial_code: None,
                },
                user_id,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_kardex_counts_registration_and_movements() {
        let db = test_db().await;
        let user_id = seed_user(&db, "ana", Role::Operator).await;
        let category_id = seed_category(&db, "Insumos").await;
        let product_id = seed_product(&db, category_id, false).await;
        let batch_id = batch_of_ten(&db, user_id, product_id).await;

        move_units(&db, user_id, batch_id, MovementKind::Salida, 7).await;
        move_units(&db, user_id, batch_id, MovementKind::Entrada, 2).await;

        let report = db
            .movements()
            .kardex(product_id, &DateRange::default())
            .await
            .unwrap();

        assert_eq!(report.opening_balance, 0);
        let balances: Vec<i64> = report.entries.iter().map(|e| e.balance).collect();
        assert_eq!(balances, vec![10, 3, 5]);
        assert_eq!(report.closing_balance, 5);
        assert_eq!(report.entries[0].source, LedgerSource::BatchRegistration);

        let batch = db.batches().get_by_id(batch_id).await.unwrap().unwrap();
        assert_eq!(batch.current_quantity, report.closing_balance);
    }

    #[tokio::test]
    async fn test_opening_balance_before_start() {
        let db = test_db().await;
        let user_id = seed_user(&db, "ana", Role::Operator).await;
        let category_id = seed_category(&db, "Insumos").await;
        let product_id = seed_product(&db, category_id, false).await;
        batch_of_ten(&db, user_id, product_id).await;

        let before = Utc.with_ymd_and_hms(2024, 4, 30, 0, 0, 0).unwrap();
        let after = Utc::now() + Duration::days(1);

        let movements = db.movements();
        assert_eq!(movements.opening_balance(product_id, Some(before)).await.unwrap(), 0);
        assert_eq!(movements.opening_balance(product_id, Some(after)).await.unwrap(), 10);
        assert_eq!(movements.opening_balance(product_id, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_daily_for_product_splits_directions() {
        let db = test_db().await;
        let user_id = seed_user(&db, "ana", Role::Operator).await;
        let category_id = seed_category(&db, "Insumos").await;
        let product_id = seed_product(&db, category_id, false).await;
        let batch_id = batch_of_ten(&db, user_id, product_id).await;

        move_units(&db, user_id, batch_id, MovementKind::Salida, 4).await;
        move_units(&db, user_id, batch_id, MovementKind::Salida, 3).await;
        move_units(&db, user_id, batch_id, MovementKind::Entrada, 1).await;

        let days = db
            .movements()
            .daily_for_product(product_id, &DateRange::default())
            .await
            .unwrap();

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].outbound, 7);
        assert_eq!(days[0].inbound, 1);

        let future = DateRange {
            start: Some(Utc::now() + Duration::days(1)),
            end: None,
        };
        let none = db
            .movements()
            .daily_for_product(product_id, &future)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_list_joins_product_and_user() {
        let db = test_db().await;
        let user_id = seed_user(&db, "ana", Role::Operator).await;
        let category_id = seed_category(&db, "Insumos").await;
        let product_id = seed_product(&db, category_id, false).await;
        let batch_id = batch_of_ten(&db, user_id, product_id).await;
        move_units(&db, user_id, batch_id, MovementKind::Salida, 2).await;

        let movements = db.movements().list().await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].product_id, product_id);
        assert_eq!(movements[0].product_name, "Guantes");
        assert_eq!(movements[0].user_login.as_deref(), Some("ana"));
        assert_eq!(movements[0].kind, MovementKind::Salida);
    }

    #[tokio::test]
    async fn test_kardex_of_unknown_product_is_not_found() {
        let db = test_db().await;
        let err = db
            .movements()
            .kardex(99, &DateRange::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
