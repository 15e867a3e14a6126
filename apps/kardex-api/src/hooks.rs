//! # Post-Commit Hooks
//!
//! Side effects that run after a stock change has been committed. A hook
//! never blocks the response and never undoes the write: failures are
//! logged and dropped.
//!
//! ```text
//! handler ──► StockLedger (commit) ──► PostCommitHooks::notify(event)
//!                                              │
//!                                              ▼
//!                                      DashboardHook
//!                                       tokio::spawn ──► recompute views
//!                                                          │
//!                                                          ▼
//!                                                    DashboardHub ──► /ws
//! ```

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use kardex_core::{MovementKind, StockStop};
use kardex_db::{Database, DbError};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::hub::{DashboardEvent, DashboardHub};

/// A committed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEvent {
    BatchRegistered { batch_id: i64 },
    MovementRegistered { movement_id: i64, batch_id: i64 },
    StockStopChanged(StockStop),
}

/// Something to run after a commit.
pub trait PostCommitHook: Send + Sync {
    fn on_commit(&self, event: &LedgerEvent);
}

/// Ordered list of hooks invoked after every committed change.
#[derive(Clone, Default)]
pub struct PostCommitHooks {
    hooks: Vec<Arc<dyn PostCommitHook>>,
}

impl PostCommitHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hook: impl PostCommitHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn notify(&self, event: LedgerEvent) {
        debug!(?event, hooks = self.hooks.len(), "Running post-commit hooks");
        for hook in &self.hooks {
            hook.on_commit(&event);
        }
    }
}

// =============================================================================
// Dashboard Hook
// =============================================================================

/// Recomputes the dashboard views and pushes them to the hub.
#[derive(Clone)]
pub struct DashboardHook {
    db: Database,
    hub: DashboardHub,
    horizon_days: u64,
}

impl DashboardHook {
    pub fn new(db: Database, hub: DashboardHub, horizon_days: u64) -> Self {
        DashboardHook {
            db,
            hub,
            horizon_days,
        }
    }

    /// Recomputes and publishes every stock view. Stops at the first failing
    /// query; views published before it stay published.
    pub async fn publish_views(&self) -> Result<(), DbError> {
        let dashboard = self.db.dashboard();

        self.send("movimientosxdia", &dashboard.daily_totals(None).await?);
        self.send(
            "entradasxdia",
            &dashboard.daily_totals(Some(MovementKind::Entrada)).await?,
        );
        self.send(
            "salidasxdia",
            &dashboard.daily_totals(Some(MovementKind::Salida)).await?,
        );
        self.send("lotesActualizados", &dashboard.current_batches().await?);
        self.send("caducidadLotes", &dashboard.batches_with_expiry().await?);

        let today = Utc::now().date_naive();
        self.send(
            "productosPorVencerActualizados",
            &dashboard.expiring_soon(today, self.horizon_days).await?,
        );
        self.send(
            "productosBajoStockMinimoActualizados",
            &dashboard.low_stock().await?,
        );

        Ok(())
    }

    fn send<T: Serialize>(&self, event: &str, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(data) => {
                self.hub.publish(DashboardEvent::new(event, data));
            }
            Err(e) => warn!(event, error = %e, "Failed to serialize dashboard view"),
        }
    }

    fn publish_stock_stop(&self, stop: StockStop) {
        let event = if stop.is_active() {
            "stockStopActivated"
        } else {
            "stockStopDeactivated"
        };
        let time = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.hub.publish(DashboardEvent::new(event, json!({ "time": time })));
    }
}

impl PostCommitHook for DashboardHook {
    fn on_commit(&self, event: &LedgerEvent) {
        match *event {
            LedgerEvent::StockStopChanged(stop) => self.publish_stock_stop(stop),
            LedgerEvent::BatchRegistered { .. } | LedgerEvent::MovementRegistered { .. } => {
                let hook = self.clone();
                let event = *event;
                tokio::spawn(async move {
                    if let Err(e) = hook.publish_views().await {
                        warn!(?event, error = %e, "Dashboard refresh failed");
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kardex_db::DbConfig;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<LedgerEvent>>);

    impl PostCommitHook for Arc<Recorder> {
        fn on_commit(&self, event: &LedgerEvent) {
            self.0.lock().unwrap().push(*event);
        }
    }

    #[test]
    fn test_hooks_run_in_order() {
        let recorder = Arc::new(Recorder::default());
        let hooks = PostCommitHooks::new().with(recorder.clone());

        hooks.notify(LedgerEvent::BatchRegistered { batch_id: 1 });
        hooks.notify(LedgerEvent::StockStopChanged(StockStop::Active));

        let seen = recorder.0.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                LedgerEvent::BatchRegistered { batch_id: 1 },
                LedgerEvent::StockStopChanged(StockStop::Active),
            ]
        );
    }

    #[tokio::test]
    async fn test_publish_views_sends_every_view() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let hub = DashboardHub::new();
        let mut rx = hub.subscribe();
        let hook = DashboardHook::new(db, hub, 30);

        hook.publish_views().await.unwrap();

        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(event.event);
        }
        assert_eq!(
            names,
            vec![
                "movimientosxdia",
                "entradasxdia",
                "salidasxdia",
                "lotesActualizados",
                "caducidadLotes",
                "productosPorVencerActualizados",
                "productosBajoStockMinimoActualizados",
            ]
        );
    }

    #[tokio::test]
    async fn test_stock_stop_change_is_published() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let hub = DashboardHub::new();
        let mut rx = hub.subscribe();
        let hook = DashboardHook::new(db, hub, 30);

        hook.on_commit(&LedgerEvent::StockStopChanged(StockStop::Inactive));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event, "stockStopDeactivated");
        assert!(event.data["time"].as_str().unwrap().ends_with('Z'));
    }
}
