//! # Kardex Report
//!
//! Per-product stock card: every stock event in time order with the running
//! balance after it.
//!
//! ```text
//! lines (unordered) ──► sort by (at, source, id)
//!                          │
//!          ┌───────────────┼─────────────────────────┐
//!          ▼               ▼                         ▼
//!   before start      inside range               after end
//!   summed into       one KardexEntry each,       dropped
//!   opening_balance   balance += sign * qty
//! ```
//!
//! A batch registration counts as an inbound line of its initial quantity,
//! so the closing balance of an unbounded report equals the product's
//! current stock across batches.

use chrono::{DateTime, Utc};

use crate::types::{DateRange, KardexEntry, KardexReport, LedgerLine, LedgerSource};

fn sort_key(line: &LedgerLine) -> (DateTime<Utc>, u8, i64) {
    let source_rank = match line.source {
        LedgerSource::BatchRegistration => 0,
        LedgerSource::Movement => 1,
    };
    (line.at, source_rank, line.reference_id)
}

fn signed(line: &LedgerLine) -> i64 {
    line.kind.sign() * line.quantity
}

/// Balance carried into the range: the signed sum of every line strictly
/// before `start`. Without a start there is nothing before the range.
pub fn opening_balance(lines: &[LedgerLine], start: Option<DateTime<Utc>>) -> i64 {
    match start {
        Some(start) => lines.iter().filter(|l| l.at < start).map(signed).sum(),
        None => 0,
    }
}

/// Builds the kardex of one product.
pub fn build_report(product_id: i64, mut lines: Vec<LedgerLine>, range: &DateRange) -> KardexReport {
    lines.sort_by_key(sort_key);

    let opening = opening_balance(&lines, range.start);
    let mut balance = opening;

    let entries: Vec<KardexEntry> = lines
        .into_iter()
        .filter(|l| !range.is_before(l.at) && !range.is_after(l.at))
        .map(|line| {
            balance += signed(&line);
            KardexEntry {
                source: line.source,
                reference_id: line.reference_id,
                batch_id: line.batch_id,
                at: line.at,
                kind: line.kind,
                quantity: line.quantity,
                serial_code: line.serial_code,
                notes: line.notes,
                balance,
            }
        })
        .collect();

    KardexReport {
        product_id,
        opening_balance: opening,
        closing_balance: balance,
        entries,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
