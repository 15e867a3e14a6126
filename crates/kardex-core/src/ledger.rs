//! # Ledger Rules
//!
//! Pure accounting rules for batch registration and stock movements.
//!
//! ## Where This Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  kardex-db::StockLedger (one transaction)                              │
//! │                                                                         │
//! │   read StockStop ──┐                                                    │
//! │   read batch ──────┼──► plan_movement(..) ← THIS MODULE (pure)          │
//! │   read serial ─────┘          │                                         │
//! │                               ├── Err(LedgerError) → rollback           │
//! │                               ▼                                         │
//! │                         MovementPlan                                    │
//! │                               │                                         │
//! │   guarded UPDATE batch ◄──────┤                                         │
//! │   guarded UPDATE serial ◄─────┤                                         │
//! │   INSERT movement ◄───────────┘                                         │
//! │   COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - `0 <= current_quantity <= initial_quantity` after every accepted plan
//! - `current = initial + Σ entradas − Σ salidas`
//! - a serialized movement flips exactly one unit, in the direction its kind
//!   dictates
//!
//! `Entrada` only models the return of previously dispensed units, so an
//! inbound movement can never lift a batch above its initial quantity.

use crate::error::LedgerError;
use crate::types::{MovementKind, NewBatch, NewMovement, SerialStatus, SerialUnit, StockStop};

// =============================================================================
// Inputs
// =============================================================================

/// The product fields batch registration depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductState {
    pub product_id: i64,
    pub tracks_serials: bool,
}

/// The batch fields movement registration depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchState {
    pub batch_id: i64,
    pub product_id: i64,
    pub tracks_serials: bool,
    pub initial_quantity: i64,
    pub current_quantity: i64,
}

impl BatchState {
    /// Units that have left the batch and may come back.
    #[inline]
    pub fn dispensed(&self) -> i64 {
        self.initial_quantity - self.current_quantity
    }
}

// =============================================================================
// Plans
// =============================================================================

/// Accepted batch registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub product_id: i64,
    pub initial_quantity: i64,
    /// Always equal to `initial_quantity` at registration.
    pub current_quantity: i64,
    /// Units to create, all [`SerialStatus::Active`].
    pub serial_codes: Vec<String>,
}

/// Status change of one serialized unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialTransition {
    pub code: String,
    pub from: SerialStatus,
    pub to: SerialStatus,
}

/// Accepted movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementPlan {
    pub batch_id: i64,
    pub kind: MovementKind,
    pub quantity: i64,
    /// Signed change applied to `current_quantity`.
    pub delta: i64,
    /// `current_quantity` after the movement.
    pub resulting_quantity: i64,
    pub serial: Option<SerialTransition>,
}

// =============================================================================
// Batch Registration
// =============================================================================

/// Decides whether a batch may be registered.
///
/// ## Rules (in order)
/// 1. Stock stop active → [`LedgerError::StockStopActive`]
/// 2. Serialized product: one serial code per unit
/// 3. Non-serialized product: no serial codes
///
/// System-wide serial uniqueness is the store's job and surfaces as a
/// conflict.
pub fn plan_batch_registration(
    stop: StockStop,
    product: &ProductState,
    batch: &NewBatch,
) -> Result<BatchPlan, LedgerError> {
    if stop.is_active() {
        return Err(LedgerError::StockStopActive);
    }

    if product.tracks_serials {
        if batch.serial_codes.len() as i64 != batch.quantity {
            return Err(LedgerError::SerialCountMismatch {
                expected: batch.quantity,
                received: batch.serial_codes.len(),
            });
        }
    } else if !batch.serial_codes.is_empty() {
        return Err(LedgerError::SerialsNotTracked {
            product_id: product.product_id,
        });
    }

    Ok(BatchPlan {
        product_id: product.product_id,
        initial_quantity: batch.quantity,
        current_quantity: batch.quantity,
        serial_codes: batch.serial_codes.clone(),
    })
}

// =============================================================================
// Movement Registration
// =============================================================================

/// Decides whether a movement may be applied to a batch.
///
/// `serial` is the unit looked up by the movement's serial code, in any
/// batch, or `None` if no such code exists.
///
/// ## Rules (in order)
/// ```text
/// stock stop active                          → StockStopActive
/// serialized product
///   ├── quantity != 1                        → SerialQuantityMustBeOne
///   ├── no serial code                       → SerialRequired
///   └── unknown / other batch / wrong state  → SerialUnavailable
/// not serialized
///   ├── serial code supplied                 → SerialsNotTracked
///   ├── Salida  and quantity > current       → ExceedsCurrent
///   ├── Entrada and nothing dispensed        → NothingToReturn
///   └── Entrada and quantity > dispensed     → ExceedsDispensed
/// ```
pub fn plan_movement(
    stop: StockStop,
    batch: &BatchState,
    movement: &NewMovement,
    serial: Option<&SerialUnit>,
) -> Result<MovementPlan, LedgerError> {
    if stop.is_active() {
        return Err(LedgerError::StockStopActive);
    }

    let transition = if batch.tracks_serials {
        Some(check_serial(batch, movement, serial)?)
    } else {
        if movement.serial_code.is_some() {
            return Err(LedgerError::SerialsNotTracked {
                product_id: batch.product_id,
            });
        }
        None
    };

    check_bounds(batch, movement)?;

    let delta = movement.kind.sign() * movement.quantity;

    Ok(MovementPlan {
        batch_id: batch.batch_id,
        kind: movement.kind,
        quantity: movement.quantity,
        delta,
        resulting_quantity: batch.current_quantity + delta,
        serial: transition,
    })
}

fn check_serial(
    batch: &BatchState,
    movement: &NewMovement,
    serial: Option<&SerialUnit>,
) -> Result<SerialTransition, LedgerError> {
    let code = movement
        .serial_code
        .as_deref()
        .ok_or(LedgerError::SerialRequired)?;

    let expected = movement.kind.required_serial_status();
    let unavailable = || LedgerError::SerialUnavailable {
        code: code.to_string(),
        kind: movement.kind,
    };

    let unit = serial.filter(|u| u.code == code).ok_or_else(unavailable)?;
    if unit.batch_id != batch.batch_id || unit.status != expected {
        return Err(unavailable());
    }

    if movement.quantity != 1 {
        return Err(LedgerError::SerialQuantityMustBeOne {
            requested: movement.quantity,
        });
    }

    Ok(SerialTransition {
        code: code.to_string(),
        from: expected,
        to: movement.kind.resulting_serial_status(),
    })
}

fn check_bounds(batch: &BatchState, movement: &NewMovement) -> Result<(), LedgerError> {
    match movement.kind {
        MovementKind::Salida => {
            if movement.quantity > batch.current_quantity {
                return Err(LedgerError::ExceedsCurrent {
                    requested: movement.quantity,
                    available: batch.current_quantity,
                });
            }
        }
        MovementKind::Entrada => {
            let dispensed = batch.dispensed();
            if dispensed <= 0 {
                return Err(LedgerError::NothingToReturn);
            }
            if movement.quantity > dispensed {
                return Err(LedgerError::ExceedsDispensed {
                    requested: movement.quantity,
                    dispensed,
                });
            }
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_batch(initial: i64, current: i64) -> BatchState {
        BatchState {
            batch_id: 1,
            product_id: 10,
            tracks_serials: false,
            initial_quantity: initial,
            current_quantity: current,
        }
    }

    fn serial_batch(initial: i64, current: i64) -> BatchState {
        BatchState {
            tracks_serials: true,
            ..plain_batch(initial, current)
        }
    }

    fn movement(kind: MovementKind, quantity: i64, serial: Option<&str>) -> NewMovement {
        NewMovement {
            batch_id: 1,
            kind,
            quantity,
            notes: None,
            serial_code: serial.map(str::to_string),
        }
    }

    fn unit(code: &str, batch_id: i64, status: SerialStatus) -> SerialUnit {
        SerialUnit {
            code: code.to_string(),
            batch_id,
            product_id: 10,
            status,
        }
    }

    fn new_batch(quantity: i64, serials: &[&str]) -> NewBatch {
        NewBatch {
            product_id: 10,
            quantity,
            entry_date: None,
            expiry_date: None,
            notes: None,
            serial_codes: serials.iter().map(|s| s.to_string()).collect(),
        }
    }

    // -------------------------------------------------------------------------
    // Batch registration
    // -------------------------------------------------------------------------

    #[test]
    fn test_batch_starts_full() {
        let product = ProductState {
            product_id: 10,
            tracks_serials: false,
        };
        let plan = plan_batch_registration(StockStop::Inactive, &product, &new_batch(10, &[]))
            .unwrap();
        assert_eq!(plan.initial_quantity, 10);
        assert_eq!(plan.current_quantity, 10);
        assert!(plan.serial_codes.is_empty());
    }

    #[test]
    fn test_serialized_batch_needs_one_code_per_unit() {
        let product = ProductState {
            product_id: 10,
            tracks_serials: true,
        };

        let err = plan_batch_registration(StockStop::Inactive, &product, &new_batch(3, &["A1", "A2"]))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::SerialCountMismatch {
                expected: 3,
                received: 2
            }
        );

        let plan = plan_batch_registration(StockStop::Inactive, &product, &new_batch(2, &["A1", "A2"]))
            .unwrap();
        assert_eq!(plan.serial_codes, vec!["A1".to_string(), "A2".to_string()]);
        assert_eq!(plan.current_quantity, 2);
    }

    #[test]
    fn test_plain_batch_rejects_serials() {
        let product = ProductState {
            product_id: 10,
            tracks_serials: false,
        };
        let err = plan_batch_registration(StockStop::Inactive, &product, &new_batch(1, &["A1"]))
            .unwrap_err();
        assert_eq!(err, LedgerError::SerialsNotTracked { product_id: 10 });
    }

    #[test]
    fn test_stock_stop_blocks_everything() {
        let product = ProductState {
            product_id: 10,
            tracks_serials: false,
        };
        assert_eq!(
            plan_batch_registration(StockStop::Active, &product, &new_batch(5, &[])),
            Err(LedgerError::StockStopActive)
        );
        assert_eq!(
            plan_movement(
                StockStop::Active,
                &plain_batch(10, 10),
                &movement(MovementKind::Salida, 1, None),
                None
            ),
            Err(LedgerError::StockStopActive)
        );
    }

    // -------------------------------------------------------------------------
    // Non-serialized movements
    // -------------------------------------------------------------------------

    #[test]
    fn test_plain_product_scenario() {
        // initial=10, current=10
        let batch = plain_batch(10, 10);

        let err = plan_movement(
            StockStop::Inactive,
            &batch,
            &movement(MovementKind::Salida, 12, None),
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            LedgerError::ExceedsCurrent {
                requested: 12,
                available: 10
            }
        );

        let plan = plan_movement(
            StockStop::Inactive,
            &batch,
            &movement(MovementKind::Salida, 7, None),
            None,
        )
        .unwrap();
        assert_eq!(plan.delta, -7);
        assert_eq!(plan.resulting_quantity, 3);

        // 7 units left: a return of 5 fits, a return of 8 does not.
        let after = plain_batch(10, 3);
        let plan = plan_movement(
            StockStop::Inactive,
            &after,
            &movement(MovementKind::Entrada, 5, None),
            None,
        )
        .unwrap();
        assert_eq!(plan.resulting_quantity, 8);

        let err = plan_movement(
            StockStop::Inactive,
            &after,
            &movement(MovementKind::Entrada, 8, None),
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            LedgerError::ExceedsDispensed {
                requested: 8,
                dispensed: 7
            }
        );
    }

    #[test]
    fn test_return_to_full_batch_rejected() {
        let err = plan_movement(
            StockStop::Inactive,
            &plain_batch(10, 10),
            &movement(MovementKind::Entrada, 1, None),
            None,
        )
        .unwrap_err();
        assert_eq!(err, LedgerError::NothingToReturn);
    }

    #[test]
    fn test_plain_product_rejects_serial_code() {
        let err = plan_movement(
            StockStop::Inactive,
            &plain_batch(10, 10),
            &movement(MovementKind::Salida, 1, Some("A1")),
            None,
        )
        .unwrap_err();
        assert_eq!(err, LedgerError::SerialsNotTracked { product_id: 10 });
    }

    // -------------------------------------------------------------------------
    // Serialized movements
    // -------------------------------------------------------------------------

    #[test]
    fn test_serialized_salida_flips_unit() {
        let a1 = unit("A1", 1, SerialStatus::Active);
        let plan = plan_movement(
            StockStop::Inactive,
            &serial_batch(2, 2),
            &movement(MovementKind::Salida, 1, Some("A1")),
            Some(&a1),
        )
        .unwrap();

        assert_eq!(plan.resulting_quantity, 1);
        assert_eq!(
            plan.serial,
            Some(SerialTransition {
                code: "A1".to_string(),
                from: SerialStatus::Active,
                to: SerialStatus::Inactive,
            })
        );
    }

    #[test]
    fn test_serialized_salida_of_dispensed_unit_rejected() {
        let a1 = unit("A1", 1, SerialStatus::Inactive);
        let err = plan_movement(
            StockStop::Inactive,
            &serial_batch(2, 1),
            &movement(MovementKind::Salida, 1, Some("A1")),
            Some(&a1),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LedgerError::SerialUnavailable {
                code: "A1".to_string(),
                kind: MovementKind::Salida
            }
        );
    }

    #[test]
    fn test_serialized_entrada_restores_unit() {
        let a1 = unit("A1", 1, SerialStatus::Inactive);
        let plan = plan_movement(
            StockStop::Inactive,
            &serial_batch(2, 1),
            &movement(MovementKind::Entrada, 1, Some("A1")),
            Some(&a1),
        )
        .unwrap();
        assert_eq!(plan.resulting_quantity, 2);
        assert_eq!(plan.serial.map(|t| t.to), Some(SerialStatus::Active));
    }

    #[test]
    fn test_serialized_rules() {
        let batch = serial_batch(2, 2);

        let available = unit("A1", batch.batch_id, SerialStatus::Active);
        let err = plan_movement(
            StockStop::Inactive,
            &batch,
            &movement(MovementKind::Salida, 2, Some("A1")),
            Some(&available),
        )
        .unwrap_err();
        assert_eq!(err, LedgerError::SerialQuantityMustBeOne { requested: 2 });

        // Availability is reported before the quantity.
        let err = plan_movement(
            StockStop::Inactive,
            &batch,
            &movement(MovementKind::Salida, 2, Some("ZZ")),
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            LedgerError::SerialUnavailable {
                code: "ZZ".to_string(),
                kind: MovementKind::Salida,
            }
        );

        let err = plan_movement(
            StockStop::Inactive,
            &batch,
            &movement(MovementKind::Salida, 1, None),
            None,
        )
        .unwrap_err();
        assert_eq!(err, LedgerError::SerialRequired);

        // Unknown code.
        let err = plan_movement(
            StockStop::Inactive,
            &batch,
            &movement(MovementKind::Salida, 1, Some("ZZ")),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::SerialUnavailable { .. }));

        // Code that belongs to another batch.
        let elsewhere = unit("B1", 99, SerialStatus::Active);
        let err = plan_movement(
            StockStop::Inactive,
            &batch,
            &movement(MovementKind::Salida, 1, Some("B1")),
            Some(&elsewhere),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::SerialUnavailable { .. }));
    }
}
