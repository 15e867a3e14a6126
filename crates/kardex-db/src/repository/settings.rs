//! Key/value settings. Today the only key is the stock-stop flag.

use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::DbResult;
use kardex_core::{StockStop, STOCK_STOP_KEY};

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value = sqlx::query_scalar::<Sqlite, String>("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    /// Inserts or replaces a setting.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Current stock-stop state. A missing row reads as inactive.
    pub async fn stock_stop(&self) -> DbResult<StockStop> {
        let value = self.get(STOCK_STOP_KEY).await?;
        Ok(StockStop::from_setting(value.as_deref()))
    }

    pub async fn set_stock_stop(&self, stop: StockStop) -> DbResult<()> {
        self.set(STOCK_STOP_KEY, stop.as_setting()).await?;
        info!(active = stop.is_active(), "Stock stop changed");
        Ok(())
    }
}

/// Reads the stock-stop flag on an open connection (inside a transaction).
pub(crate) async fn read_stock_stop(conn: &mut SqliteConnection) -> DbResult<StockStop> {
    let value = sqlx::query_scalar::<Sqlite, String>("SELECT value FROM settings WHERE key = ?")
        .bind(STOCK_STOP_KEY)
        .fetch_optional(conn)
        .await?;

    Ok(StockStop::from_setting(value.as_deref()))
}

#[cfg(test)]
mod tests {
    use crate::test_support::test_db;
    use kardex_core::StockStop;

    #[tokio::test]
    async fn test_stock_stop_defaults_to_inactive() {
        let db = test_db().await;
        assert_eq!(db.settings().stock_stop().await.unwrap(), StockStop::Inactive);
    }

    #[tokio::test]
    async fn test_stock_stop_toggles() {
        let db = test_db().await;
        let settings = db.settings();

        settings.set_stock_stop(StockStop::Active).await.unwrap();
        assert_eq!(settings.stock_stop().await.unwrap(), StockStop::Active);
        assert_eq!(
            settings.get("StockStop").await.unwrap().as_deref(),
            Some("true")
        );

        settings.set_stock_stop(StockStop::Inactive).await.unwrap();
        assert_eq!(settings.stock_stop().await.unwrap(), StockStop::Inactive);
    }
}
