//! # Dashboard Repository
//!
//! Aggregate views served by `/api/charts/*` and pushed over the dashboard
//! WebSocket after every stock change.
//!
//! ```text
//! movimientosxdia / entradasxdia / salidasxdia  ─► daily_totals(kind)
//! lotesactuales                                 ─► current_batches()
//! caducidadlotes                                ─► batches_with_expiry()
//! productosPorVencer                            ─► expiring_soon(today, days)
//! productosBajoStockMinimo                      ─► low_stock()
//! ```

use chrono::{Days, NaiveDate};
use sqlx::SqlitePool;
use tracing::debug;

use super::batch::BATCH_SELECT;
use crate::error::DbResult;
use kardex_core::{Batch, DailyTotal, ExpiringBatch, LowStockProduct, MovementKind};

#[derive(Debug, Clone)]
pub struct DashboardRepository {
    pool: SqlitePool,
}

impl DashboardRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DashboardRepository { pool }
    }

    /// Moved quantity per calendar day (UTC), all kinds or just one.
    pub async fn daily_totals(&self, kind: Option<MovementKind>) -> DbResult<Vec<DailyTotal>> {
        let totals = sqlx::query_as::<_, DailyTotal>(
            r#"
            SELECT date(moved_at) AS day, SUM(quantity) AS total
            FROM movements
            WHERE (? IS NULL OR kind = ?)
            GROUP BY date(moved_at)
            ORDER BY day
            "#,
        )
        .bind(kind)
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;

        Ok(totals)
    }

    /// Every batch with its current quantity.
    pub async fn current_batches(&self) -> DbResult<Vec<Batch>> {
        let sql = format!("{BATCH_SELECT} ORDER BY b.id");

        let batches = sqlx::query_as::<_, Batch>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(batches)
    }

    /// Batches that have an expiry date, soonest first.
    pub async fn batches_with_expiry(&self) -> DbResult<Vec<Batch>> {
        let sql = format!(
            "{BATCH_SELECT} WHERE b.expiry_date IS NOT NULL ORDER BY b.expiry_date, b.id"
        );

        let batches = sqlx::query_as::<_, Batch>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(batches)
    }

    /// Batches with stock left that expire between `today` and
    /// `today + horizon_days`, both inclusive. Nearest expiry first.
    pub async fn expiring_soon(
        &self,
        today: NaiveDate,
        horizon_days: u64,
    ) -> DbResult<Vec<ExpiringBatch>> {
        let until = today.checked_add_days(Days::new(horizon_days)).unwrap_or(NaiveDate::MAX);

        let batches = sqlx::query_as::<_, ExpiringBatch>(
            r#"
            SELECT
                b.id AS batch_id,
                b.product_id,
                p.name || ' (Lote ' || b.id || ')' AS label,
                b.entry_date,
                b.expiry_date,
                CAST(julianday(b.expiry_date) - julianday(?) AS INTEGER) AS days_to_expiry,
                b.current_quantity
            FROM batches b
            JOIN products p ON p.id = b.product_id
            WHERE b.expiry_date IS NOT NULL
              AND b.current_quantity > 0
              AND b.expiry_date >= ?
              AND b.expiry_date <= ?
            ORDER BY b.expiry_date, b.id
            "#,
        )
        .bind(today)
        .bind(today)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = batches.len(), horizon_days, "Computed expiring batches");
        Ok(batches)
    }

    /// Products whose stock across their batches is below `stock_min`,
    /// largest shortfall first. Products without any batch are left out.
    pub async fn low_stock(&self) -> DbResult<Vec<LowStockProduct>> {
        let products = sqlx::query_as::<_, LowStockProduct>(
            r#"
            SELECT
                p.id AS product_id,
                p.name,
                SUM(b.current_quantity) AS current_stock,
                p.stock_min,
                p.stock_min - SUM(b.current_quantity) AS shortfall
            FROM products p
            JOIN batches b ON b.product_id = p.id
            GROUP BY p.id, p.name, p.stock_min
            HAVING SUM(b.current_quantity) < p.stock_min
            ORDER BY shortfall DESC, p.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_category, seed_product, seed_user, test_db};
    use crate::Database;
    use chrono::Utc;
    use kardex_core::{NewBatch, NewMovement, Role};

    async fn register(
        db: &Database,
        user_id: i64,
        product_id: i64,
        quantity: i64,
        expiry_date: Option<NaiveDate>,
    ) -> i64 {
        db.ledger()
            .register_batch(
                &NewBatch {
                    product_id,
                    quantity,
                    entry_date: None,
                    expiry_date,
                    notes: None,
                    serial_codes: vec![],
                },
                user_id,
            )
            .await
            .unwrap()
    }

    async fn salida(db: &Database, user_id: i64, batch_id: i64, quantity: i64) {
        db.ledger()
            .register_movement(
                &NewMovement {
                    batch_id,
                    kind: MovementKind::Salida,
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
    async fn test_daily_totals_by_kind() {
        let db = test_db().await;
        let user_id = seed_user(&db, "ana", Role::Operator).await;
        let category_id = seed_category(&db, "Insumos").await;
        let product_id = seed_product(&db, category_id, false).await;
        let batch_id = register(&db, user_id, product_id, 10, None).await;

        salida(&db, user_id, batch_id, 4).await;
        db.ledger()
            .register_movement(
                &NewMovement {
                    batch_id,
                    kind: MovementKind::Entrada,
                    quantity: 1,
                    notes: None,
                    serial_code: None,
                },
                user_id,
            )
            .await
            .unwrap();

        let dashboard = db.dashboard();
        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();

        let all = dashboard.daily_totals(None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].day, today);
        assert_eq!(all[0].total, 5);

        let out = dashboard.daily_totals(Some(MovementKind::Salida)).await.unwrap();
        assert_eq!(out[0].total, 4);
        let back = dashboard.daily_totals(Some(MovementKind::Entrada)).await.unwrap();
        assert_eq!(back[0].total, 1);
    }

    #[tokio::test]
    async fn test_expiring_soon_window_and_order() {
        let db = test_db().await;
        let user_id = seed_user(&db, "ana", Role::Operator).await;
        let category_id = seed_category(&db, "Insumos").await;
        let product_id = seed_product(&db, category_id, false).await;

        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let in_days = |d: u64| today.checked_add_days(Days::new(d));

        let later = register(&db, user_id, product_id, 5, in_days(20)).await;
        let sooner = register(&db, user_id, product_id, 5, in_days(3)).await;
        let _outside = register(&db, user_id, product_id, 5, in_days(31)).await;
        let _expired = register(&db, user_id, product_id, 5, NaiveDate::from_ymd_opt(2024, 5, 31)).await;
        let edge = register(&db, user_id, product_id, 5, in_days(30)).await;
        let empty = register(&db, user_id, product_id, 2, in_days(1)).await;
        salida(&db, user_id, empty, 2).await;

        let expiring = db.dashboard().expiring_soon(today, 30).await.unwrap();
        let ids: Vec<i64> = expiring.iter().map(|b| b.batch_id).collect();
        assert_eq!(ids, vec![sooner, later, edge]);
        assert_eq!(expiring[0].days_to_expiry, 3);
        assert_eq!(expiring[2].days_to_expiry, 30);
        assert_eq!(expiring[0].label, format!("Guantes (Lote {sooner})"));

        assert_eq!(db.dashboard().batches_with_expiry().await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_low_stock_sums_batches_and_skips_products_without_batches() {
        let db = test_db().await;
        let user_id = seed_user(&db, "ana", Role::Operator).await;
        let category_id = seed_category(&db, "Insumos").await;
        // stock_min = 5 for seeded products
        let low = seed_product(&db, category_id, false).await;
        let fine = seed_product(&db, category_id, false).await;
        let _no_batches = seed_product(&db, category_id, false).await;

        register(&db, user_id, low, 2, None).await;
        register(&db, user_id, low, 1, None).await;
        register(&db, user_id, fine, 9, None).await;

        let products = db.dashboard().low_stock().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].product_id, low);
        assert_eq!(products[0].current_stock, 3);
        assert_eq!(products[0].shortfall, 2);

        assert_eq!(db.dashboard().current_batches().await.unwrap().len(), 3);
    }
}
