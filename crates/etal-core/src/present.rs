//! # Presentation Helpers
//!
//! Filtering, ordering and summarizing of reconciliation output.
//!
//! ## Filter Scope
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  normalized records ──► RecordFilter ──► aggregate ──► rows            │
//! │                         ▲                                               │
//! │                         └── applied BEFORE aggregation: a filtered-out │
//! │                             outlet never contributes to any key        │
//! │                                                                         │
//! │  outlet:  ""  or None  → every outlet                                  │
//! │  outlet: "Mbao"        → exactly "Mbao" (case-sensitive)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::quantity::Quantity;
use crate::types::{ConsolidatedRow, StockRecord, TransferRecord};

// =============================================================================
// Record Filter
// =============================================================================

/// Optional outlet and product restrictions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilter {
    pub outlet: Option<String>,
    pub product: Option<String>,
}

impl RecordFilter {
    /// Builds a filter; blank values mean "no restriction".
    pub fn new(outlet: Option<&str>, product: Option<&str>) -> Self {
        RecordFilter {
            outlet: non_blank(outlet),
            product: non_blank(product),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.outlet.is_none() && self.product.is_none()
    }

    /// Exact string equality on each restricted field.
    pub fn matches(&self, outlet: &str, product: &str) -> bool {
        self.outlet.as_deref().map_or(true, |o| o == outlet)
            && self.product.as_deref().map_or(true, |p| p == product)
    }

    pub fn retain_stock(&self, records: &mut Vec<StockRecord>) {
        if !self.is_unrestricted() {
            records.retain(|r| self.matches(&r.outlet, &r.product));
        }
    }

    pub fn retain_transfers(&self, records: &mut Vec<TransferRecord>) {
        if !self.is_unrestricted() {
            records.retain(|r| self.matches(&r.outlet, &r.product));
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Ordering
// =============================================================================

/// Sorts by calendar date, then outlet, then product.
///
/// Dates are compared as calendar values, so 02/01/2025 precedes 10/01/2025
/// regardless of how they were written upstream.
pub fn sort_rows(rows: &mut [ConsolidatedRow]) {
    rows.sort_by(|a, b| {
        (a.date, &a.outlet, &a.product).cmp(&(b.date, &b.outlet, &b.product))
    });
}

// =============================================================================
// Summary
// =============================================================================

/// Totals over a set of rows, shown above the reconciliation table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReconSummary {
    pub row_count: usize,
    /// Rows with negative theoretical sales.
    pub shortfall_count: usize,
    pub outlet_count: usize,
    pub product_count: usize,
    pub total_morning: Quantity,
    pub total_evening: Quantity,
    pub total_transfers: Quantity,
    pub total_theoretical_sales: Quantity,
}

impl ReconSummary {
    /// Fails only when a column total overflows.
    pub fn from_rows(rows: &[ConsolidatedRow]) -> CoreResult<Self> {
        let outlets: BTreeSet<&str> = rows.iter().map(|r| r.outlet.as_str()).collect();
        let products: BTreeSet<&str> = rows.iter().map(|r| r.product.as_str()).collect();

        Ok(ReconSummary {
            row_count: rows.len(),
            shortfall_count: rows.iter().filter(|r| r.is_shortfall()).count(),
            outlet_count: outlets.len(),
            product_count: products.len(),
            total_morning: Quantity::checked_sum(rows.iter().map(|r| r.morning_qty))?,
            total_evening: Quantity::checked_sum(rows.iter().map(|r| r.evening_qty))?,
            total_transfers: Quantity::checked_sum(rows.iter().map(|r| r.transfer_qty))?,
            total_theoretical_sales: Quantity::checked_sum(
                rows.iter().map(|r| r.theoretical_sales),
            )?,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(date: NaiveDate, outlet: &str, product: &str, sales: i64) -> ConsolidatedRow {
        ConsolidatedRow {
            date,
            outlet: outlet.into(),
            product: product.into(),
            morning_qty: Quantity::from(10),
            evening_qty: Quantity::zero(),
            transfer_qty: Quantity::zero(),
            theoretical_sales: Quantity::from(sales),
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_blank_filter_is_unrestricted() {
        let filter = RecordFilter::new(Some("  "), Some(""));
        assert!(filter.is_unrestricted());
        assert!(filter.matches("anything", "at all"));
    }

    #[test]
    fn test_filter_is_exact_and_case_sensitive() {
        let filter = RecordFilter::new(Some("Mbao"), None);
        assert!(filter.matches("Mbao", "Boeuf"));
        assert!(!filter.matches("mbao", "Boeuf"));
        assert!(!filter.matches("Mbao 2", "Boeuf"));

        let filter = RecordFilter::new(Some("Mbao"), Some("Veau"));
        assert!(filter.matches("Mbao", "Veau"));
        assert!(!filter.matches("Mbao", "Boeuf"));
    }

    #[test]
    fn test_sort_uses_calendar_order_not_text() {
        // As DD/MM/YYYY strings "10/01" < "31/12" would invert these
        let mut rows = vec![
            row(ymd(2025, 1, 10), "A", "Boeuf", 1),
            row(ymd(2024, 12, 31), "A", "Boeuf", 1),
        ];
        sort_rows(&mut rows);
        assert_eq!(rows[0].date, ymd(2024, 12, 31));
    }

    #[test]
    fn test_sort_is_deterministic() {
        let make = || {
            vec![
                row(ymd(2025, 1, 2), "B", "Veau", 1),
                row(ymd(2025, 1, 1), "b", "Agneau", 1),
                row(ymd(2025, 1, 1), "B", "Veau", 1),
                row(ymd(2025, 1, 1), "B", "Agneau", 1),
            ]
        };
        let mut first = make();
        let mut second = make();
        second.reverse();
        sort_rows(&mut first);
        sort_rows(&mut second);
        assert_eq!(first, second);

        let order: Vec<String> = first.iter().map(|r| r.key().to_string()).collect();
        assert_eq!(
            order,
            [
                "2025-01-01|B|Agneau",
                "2025-01-01|B|Veau",
                "2025-01-01|b|Agneau",
                "2025-01-02|B|Veau"
            ]
        );
    }

    #[test]
    fn test_summary() {
        let rows = vec![
            row(ymd(2025, 1, 1), "A", "Boeuf", -5),
            row(ymd(2025, 1, 1), "B", "Boeuf", 3),
            row(ymd(2025, 1, 2), "A", "Veau", -1),
        ];
        let summary = ReconSummary::from_rows(&rows).unwrap();
        assert_eq!(summary.row_count, 3);
        assert_eq!(summary.shortfall_count, 2);
        assert_eq!(summary.outlet_count, 2);
        assert_eq!(summary.product_count, 2);
        assert_eq!(summary.total_morning, Quantity::from(30));
        assert_eq!(summary.total_theoretical_sales, Quantity::from(-3));
    }

    #[test]
    fn test_summary_of_nothing() {
        assert_eq!(ReconSummary::from_rows(&[]).unwrap(), ReconSummary::default());
    }

    #[test]
    fn test_summary_overflow_is_an_error() {
        let mut big = row(ymd(2025, 1, 1), "A", "Boeuf", 0);
        big.evening_qty = Quantity::from_decimal(rust_decimal::Decimal::MAX);
        let rows = vec![big.clone(), big];
        assert!(matches!(
            ReconSummary::from_rows(&rows),
            Err(crate::error::CoreError::Overflow { .. })
        ));
    }
}
