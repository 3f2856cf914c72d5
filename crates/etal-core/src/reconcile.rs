//! # Theoretical Sales Calculator
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   theoretical_sales = evening - (morning + transfers)                   │
//! │                                                                         │
//! │   Any missing term is 0. A key present in only ONE of the three maps   │
//! │   still yields a row. Negative results are kept: they are the          │
//! │   shortfall signal this whole pipeline exists to surface.              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`reconcile_records`] runs the whole pure part of the pipeline, from raw
//! upstream JSON to sorted rows. The only way it fails is a quantity leaving
//! the decimal range.

use crate::aggregate::{AggregationStats, KeyedIndex};
use crate::error::{CoreError, CoreResult};
use crate::normalize::{normalize_stock_batch, normalize_transfer_batch};
use crate::present::{sort_rows, RecordFilter};
use crate::quantity::Quantity;
use crate::types::{ConsolidatedRow, RawRecord, StockSnapshot};

/// Computes theoretical sales for one key.
#[inline]
pub fn theoretical_sales(
    morning: Quantity,
    evening: Quantity,
    transfer: Quantity,
) -> CoreResult<Quantity> {
    evening.checked_sub(morning.checked_add(transfer)?)
}

/// One row per key in the union of the three maps, in key order.
pub fn consolidate(index: &KeyedIndex) -> CoreResult<Vec<ConsolidatedRow>> {
    index
        .keys()
        .into_iter()
        .map(|key| {
            let morning_qty = index.morning_qty(key);
            let evening_qty = index.evening_qty(key);
            let transfer_qty = index.transfer_qty(key);

            Ok(ConsolidatedRow {
                date: key.date,
                outlet: key.outlet.clone(),
                product: key.product.clone(),
                morning_qty,
                evening_qty,
                transfer_qty,
                theoretical_sales: theoretical_sales(morning_qty, evening_qty, transfer_qty)?,
            })
        })
        .collect()
}

// =============================================================================
// Full Pipeline
// =============================================================================

/// Result of one pure reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Sorted rows.
    pub rows: Vec<ConsolidatedRow>,
    pub stats: AggregationStats,
    /// Records dropped during normalization, with the reason.
    pub rejected: Vec<CoreError>,
}

/// normalize → filter → aggregate → consolidate → sort.
pub fn reconcile_records(
    morning: &[RawRecord],
    evening: &[RawRecord],
    transfers: &[RawRecord],
    filter: &RecordFilter,
) -> CoreResult<Reconciliation> {
    let mut morning = normalize_stock_batch(morning, StockSnapshot::Morning);
    let mut evening = normalize_stock_batch(evening, StockSnapshot::Evening);
    let mut transfers = normalize_transfer_batch(transfers);

    filter.retain_stock(&mut morning.records);
    filter.retain_stock(&mut evening.records);
    filter.retain_transfers(&mut transfers.records);

    let mut rejected = morning.rejected;
    rejected.append(&mut evening.rejected);
    rejected.append(&mut transfers.rejected);

    let index = KeyedIndex::build(morning.records, evening.records, transfers.records)?;
    let mut rows = consolidate(&index)?;
    sort_rows(&mut rows);

    Ok(Reconciliation {
        rows,
        stats: index.stats,
        rejected,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use std::str::FromStr;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn q(s: &str) -> Quantity {
        Quantity::from_decimal(Decimal::from_str(s).unwrap())
    }

    fn raw(d: u32, value: Value) -> RawRecord {
        RawRecord::new(day(d), value)
    }

    fn stock(d: u32, outlet: &str, product: &str, qty: &str) -> RawRecord {
        raw(d, json!({ "pointVente": outlet, "produit": product, "quantite": qty }))
    }

    fn transfer(d: u32, outlet: &str, product: &str, qty: &str, impact: i64) -> RawRecord {
        raw(
            d,
            json!({ "pointVente": outlet, "produit": product, "quantite": qty, "impact": impact }),
        )
    }

    fn sales(morning: &str, evening: &str, transfer: &str) -> Quantity {
        theoretical_sales(q(morning), q(evening), q(transfer)).unwrap()
    }

    #[test]
    fn test_formula() {
        assert_eq!(sales("10", "4", "2"), q("-8"));
        assert_eq!(sales("0", "0", "0"), q("0"));
        assert_eq!(sales("1.5", "4.25", "0.75"), q("2"));
    }

    #[test]
    fn test_unchanged_stock_without_transfers_yields_zero() {
        assert_eq!(sales("10", "10", "0"), q("0"));
        assert_eq!(sales("10", "10", "0"), sales("10", "10", "0"));
    }

    #[test]
    fn test_overflowing_quantities_fail_the_pass() {
        let max = Decimal::MAX.to_string();
        assert!(matches!(
            theoretical_sales(q(&max), q("0"), q("1")),
            Err(CoreError::Overflow { .. })
        ));

        let result = reconcile_records(
            &[stock(1, "A", "Boeuf", &max)],
            &[stock(1, "A", "Boeuf", "-1")],
            &[],
            &RecordFilter::default(),
        );
        assert!(matches!(result, Err(CoreError::Overflow { .. })));
    }

    #[test]
    fn test_morning_only_key_yields_negative_row() {
        let result =
            reconcile_records(&[stock(1, "A", "Boeuf", "5")], &[], &[], &RecordFilter::default())
                .unwrap();
        assert_eq!(result.rows.len(), 1);
        let row = &result.rows[0];
        assert_eq!(row.morning_qty, q("5"));
        assert!(row.evening_qty.is_zero());
        assert!(row.transfer_qty.is_zero());
        assert_eq!(row.theoretical_sales, q("-5"));
        assert!(row.is_shortfall());
    }

    #[test]
    fn test_transfer_only_key_yields_row() {
        let result = reconcile_records(
            &[],
            &[],
            &[transfer(1, "A", "Boeuf", "3", 1)],
            &RecordFilter::default(),
        )
        .unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].transfer_qty, q("3"));
        assert_eq!(result.rows[0].theoretical_sales, q("-3"));
    }

    #[test]
    fn test_key_union_completeness() {
        let morning = [stock(1, "A", "Boeuf", "10"), stock(1, "B", "Veau", "1")];
        let evening = [stock(1, "A", "Boeuf", "4"), stock(2, "A", "Boeuf", "6")];
        let transfers = [transfer(1, "C", "Agneau", "2", 1), transfer(1, "A", "Boeuf", "2", 1)];
        let result =
            reconcile_records(&morning, &evening, &transfers, &RecordFilter::default()).unwrap();

        let keys: Vec<String> = result.rows.iter().map(|r| r.key().to_string()).collect();
        assert_eq!(
            keys,
            [
                "2025-01-01|A|Boeuf",
                "2025-01-01|B|Veau",
                "2025-01-01|C|Agneau",
                "2025-01-02|A|Boeuf"
            ]
        );

        // (10 in, 4 left, 2 transferred in) → 4 - (10 + 2) = -8
        assert_eq!(result.rows[0].theoretical_sales, q("-8"));
    }

    #[test]
    fn test_transfer_summation_end_to_end() {
        let result = reconcile_records(
            &[],
            &[stock(1, "A", "Boeuf", "5")],
            &[transfer(1, "A", "Boeuf", "3", 1), transfer(1, "A", "Boeuf", "2", 1)],
            &RecordFilter::default(),
        )
        .unwrap();
        assert_eq!(result.rows[0].transfer_qty, q("5"));
        assert_eq!(result.stats.transfers_merged, 1);
    }

    #[test]
    fn test_stock_non_summation_end_to_end() {
        let result = reconcile_records(
            &[stock(1, "A", "Boeuf", "5"), stock(1, "A", "Boeuf", "7")],
            &[],
            &[],
            &RecordFilter::default(),
        )
        .unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].morning_qty, q("7"));
        assert_eq!(result.stats.morning_duplicates, 1);
    }

    #[test]
    fn test_filter_applies_before_aggregation() {
        let morning = [stock(1, "A", "Boeuf", "5"), stock(1, "B", "Boeuf", "9")];
        let transfers = [transfer(1, "B", "Boeuf", "1", 1)];
        let filter = RecordFilter::new(Some("A"), None);
        let result = reconcile_records(&morning, &[], &transfers, &filter).unwrap();

        assert_eq!(result.rows.len(), 1);
        assert!(result.rows.iter().all(|r| r.outlet == "A"));
    }

    #[test]
    fn test_rejected_records_are_reported() {
        let morning = [stock(1, "A", "Boeuf", "5"), raw(1, json!({ "quantite": 4 }))];
        let result =
            reconcile_records(&morning, &[], &[raw(1, json!(null))], &RecordFilter::default())
                .unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rejected.len(), 2);
    }

    #[test]
    fn test_empty_input_yields_no_rows() {
        let result = reconcile_records(&[], &[], &[], &RecordFilter::default()).unwrap();
        assert!(result.rows.is_empty());
        assert!(result.rejected.is_empty());
    }
}
