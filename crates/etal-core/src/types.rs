//! # Domain Types
//!
//! Canonical record shapes for one reconciliation run.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  StockRecord    │   │ TransferRecord  │   │ ConsolidatedRow │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  date           │   │  date           │   │  date           │       │
//! │  │  outlet         │   │  outlet         │   │  outlet         │       │
//! │  │  product        │   │  product        │   │  product        │       │
//! │  │  quantity       │   │  direction      │   │  morning_qty    │       │
//! │  │  unit_price     │   │  quantity       │   │  evening_qty    │       │
//! │  │  amount         │   │  unit_price     │   │  transfer_qty   │       │
//! │  │  comment        │   │  total, comment │   │  theoretical_.. │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │           │                     │                     ▲                 │
//! │           └──────── RecordKey ──┴─────────────────────┘                 │
//! │                 (date, outlet, product)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity here lives for one run only. Nothing is persisted.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use ts_rs::TS;

use crate::quantity::Quantity;

// =============================================================================
// Record Key
// =============================================================================

/// Composite key identifying one (date, outlet, product) cell.
///
/// The derived `Ord` compares fields in declaration order, which is exactly
/// the presentation order: calendar date, then outlet, then product, both
/// names compared case-sensitively byte by byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RecordKey {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub outlet: String,
    pub product: String,
}

impl RecordKey {
    pub fn new(date: NaiveDate, outlet: impl Into<String>, product: impl Into<String>) -> Self {
        RecordKey {
            date,
            outlet: outlet.into(),
            product: product.into(),
        }
    }
}

/// Renders `date|outlet|product`, for logs only.
impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.date, self.outlet, self.product)
    }
}

// =============================================================================
// Record Kind
// =============================================================================

/// The three upstream collections fetched per date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    MorningStock,
    EveningStock,
    Transfers,
}

impl RecordKind {
    /// All kinds, in fetch order.
    pub const ALL: [RecordKind; 3] = [
        RecordKind::MorningStock,
        RecordKind::EveningStock,
        RecordKind::Transfers,
    ];
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::MorningStock => write!(f, "morning stock"),
            RecordKind::EveningStock => write!(f, "evening stock"),
            RecordKind::Transfers => write!(f, "transfers"),
        }
    }
}

// =============================================================================
// Stock Snapshot
// =============================================================================

/// Which stock count a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockSnapshot {
    /// Count taken at opening.
    Morning,
    /// Count taken at closing.
    Evening,
}

impl From<StockSnapshot> for RecordKind {
    fn from(snapshot: StockSnapshot) -> Self {
        match snapshot {
            StockSnapshot::Morning => RecordKind::MorningStock,
            StockSnapshot::Evening => RecordKind::EveningStock,
        }
    }
}

// =============================================================================
// Raw Record
// =============================================================================

/// One upstream JSON record, tagged with the date it was fetched for.
///
/// The fetch date is the fallback when the payload has no readable date.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub fetched_for: NaiveDate,
    pub value: Value,
}

impl RawRecord {
    pub fn new(fetched_for: NaiveDate, value: Value) -> Self {
        RawRecord { fetched_for, value }
    }
}

// =============================================================================
// Stock Record
// =============================================================================

/// A morning or evening stock line for one outlet and product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub outlet: String,
    pub product: String,
    pub quantity: Quantity,
    #[ts(type = "string")]
    pub unit_price: Decimal,
    #[ts(type = "string")]
    pub amount: Decimal,
    pub comment: String,
}

impl StockRecord {
    /// Returns the composite key of this record.
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.date, self.outlet.clone(), self.product.clone())
    }
}

// =============================================================================
// Transfer
// =============================================================================

/// Direction of a stock movement outside of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    /// Goods entering the outlet (restock, inbound move).
    #[default]
    In,
    /// Goods leaving the outlet.
    Out,
}

impl TransferDirection {
    /// Decodes the upstream signed `impact` field: negative means outbound.
    pub fn from_impact(impact: Decimal) -> Self {
        if impact.is_sign_negative() && !impact.is_zero() {
            TransferDirection::Out
        } else {
            TransferDirection::In
        }
    }

    /// Applies the direction sign to an upstream quantity.
    pub fn apply(&self, quantity: Quantity) -> Quantity {
        match self {
            TransferDirection::In => quantity,
            TransferDirection::Out => -quantity,
        }
    }
}

/// A single transfer line. Several may share one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub outlet: String,
    pub product: String,
    pub direction: TransferDirection,
    /// Quantity as recorded upstream, before the direction sign is applied.
    pub quantity: Quantity,
    #[ts(type = "string")]
    pub unit_price: Decimal,
    #[ts(type = "string")]
    pub total: Decimal,
    pub comment: String,
}

impl TransferRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.date, self.outlet.clone(), self.product.clone())
    }

    /// Quantity with the direction sign applied.
    pub fn net_quantity(&self) -> Quantity {
        self.direction.apply(self.quantity)
    }
}

// =============================================================================
// Consolidated Row
// =============================================================================

/// One reconciled (date, outlet, product) line.
///
/// `theoretical_sales = evening_qty - (morning_qty + transfer_qty)`.
/// A negative value is a shortfall signal (theft, spoilage, miscount) and is
/// kept as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedRow {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub outlet: String,
    pub product: String,
    pub morning_qty: Quantity,
    pub evening_qty: Quantity,
    pub transfer_qty: Quantity,
    pub theoretical_sales: Quantity,
}

impl ConsolidatedRow {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.date, self.outlet.clone(), self.product.clone())
    }

    /// True when theoretical sales came out negative.
    #[inline]
    pub fn is_shortfall(&self) -> bool {
        self.theoretical_sales.is_negative()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn test_record_key_orders_by_date_then_outlet_then_product() {
        let mut keys = vec![
            RecordKey::new(day(2), "A", "Boeuf"),
            RecordKey::new(day(1), "B", "Agneau"),
            RecordKey::new(day(1), "A", "Veau"),
            RecordKey::new(day(1), "A", "Boeuf"),
        ];
        keys.sort();
        assert_eq!(keys[0], RecordKey::new(day(1), "A", "Boeuf"));
        assert_eq!(keys[1], RecordKey::new(day(1), "A", "Veau"));
        assert_eq!(keys[2], RecordKey::new(day(1), "B", "Agneau"));
        assert_eq!(keys[3], RecordKey::new(day(2), "A", "Boeuf"));
    }

    #[test]
    fn test_record_key_display() {
        let key = RecordKey::new(day(3), "Mbao", "Poulet");
        assert_eq!(key.to_string(), "2025-01-03|Mbao|Poulet");
    }

    #[test]
    fn test_transfer_direction_from_impact() {
        assert_eq!(TransferDirection::from_impact(Decimal::ONE), TransferDirection::In);
        assert_eq!(TransferDirection::from_impact(Decimal::ZERO), TransferDirection::In);
        assert_eq!(
            TransferDirection::from_impact(Decimal::NEGATIVE_ONE),
            TransferDirection::Out
        );
    }

    #[test]
    fn test_transfer_net_quantity() {
        let mut transfer = TransferRecord {
            date: day(1),
            outlet: "A".into(),
            product: "Boeuf".into(),
            direction: TransferDirection::In,
            quantity: Quantity::from(4),
            unit_price: Decimal::ZERO,
            total: Decimal::ZERO,
            comment: String::new(),
        };
        assert_eq!(transfer.net_quantity(), Quantity::from(4));

        transfer.direction = TransferDirection::Out;
        assert_eq!(transfer.net_quantity(), Quantity::from(-4));
    }

    #[test]
    fn test_row_serializes_camel_case() {
        let row = ConsolidatedRow {
            date: day(1),
            outlet: "A".into(),
            product: "Boeuf".into(),
            morning_qty: Quantity::from(5),
            evening_qty: Quantity::zero(),
            transfer_qty: Quantity::zero(),
            theoretical_sales: Quantity::from(-5),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["morningQty"], "5");
        assert_eq!(json["theoreticalSales"], "-5");
        assert_eq!(json["date"], "2025-01-01");
        assert!(row.is_shortfall());
    }
}
