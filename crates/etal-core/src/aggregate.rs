//! # Keyed Aggregator
//!
//! Indexes normalized records by (date, outlet, product).
//!
//! ## Merge Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  morning stock   ──► last write wins   (a stock count is a snapshot)   │
//! │  evening stock   ──► last write wins                                    │
//! │  transfers       ──► summed            (several moves per day are      │
//! │                                          normal)                        │
//! │                                                                         │
//! │  Key (2025-01-01, Mbao, Boeuf):                                         │
//! │    morning  [5, 7]        → 7     (1 duplicate counted)                 │
//! │    transfer [+3, -1, +2]  → +4    (3 entries)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A replaced stock record usually means a double entry on the stock sheet.
//! It is not an error, but [`AggregationStats`] counts it so callers can
//! report it.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::quantity::Quantity;
use crate::types::{RecordKey, StockRecord, TransferRecord};

// =============================================================================
// Transfer Total
// =============================================================================

/// All transfers sharing one key, merged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransferTotal {
    /// Sum of signed (net) quantities.
    pub quantity: Quantity,
    /// Unit price of the last merged transfer.
    pub unit_price: Decimal,
    /// Sum of upstream totals. Not kept consistent with `quantity`.
    pub total: Decimal,
    /// Number of transfers merged.
    pub entries: usize,
}

impl TransferTotal {
    fn merge(&mut self, transfer: &TransferRecord) -> CoreResult<()> {
        self.quantity = self.quantity.checked_add(transfer.net_quantity())?;
        self.total = self
            .total
            .checked_add(transfer.total)
            .ok_or(CoreError::Overflow { operation: "addition" })?;
        self.unit_price = transfer.unit_price;
        self.entries += 1;
        Ok(())
    }
}

// =============================================================================
// Aggregation Stats
// =============================================================================

/// Data-quality counters collected while indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AggregationStats {
    /// Morning records that replaced an earlier one with the same key.
    pub morning_duplicates: usize,
    /// Evening records that replaced an earlier one with the same key.
    pub evening_duplicates: usize,
    /// Transfers folded into an already-present key.
    pub transfers_merged: usize,
}

impl AggregationStats {
    pub fn stock_duplicates(&self) -> usize {
        self.morning_duplicates + self.evening_duplicates
    }
}

// =============================================================================
// Keyed Index
// =============================================================================

/// The three keyed maps for one run.
#[derive(Debug, Clone, Default)]
pub struct KeyedIndex {
    pub morning: BTreeMap<RecordKey, StockRecord>,
    pub evening: BTreeMap<RecordKey, StockRecord>,
    pub transfers: BTreeMap<RecordKey, TransferTotal>,
    pub stats: AggregationStats,
}

impl KeyedIndex {
    /// Builds the index. Input order matters only for stock duplicates, where
    /// the later record wins. Fails only when a transfer sum overflows.
    pub fn build<M, E, T>(morning: M, evening: E, transfers: T) -> CoreResult<Self>
    where
        M: IntoIterator<Item = StockRecord>,
        E: IntoIterator<Item = StockRecord>,
        T: IntoIterator<Item = TransferRecord>,
    {
        let mut index = KeyedIndex::default();

        index.stats.morning_duplicates = insert_last_wins(&mut index.morning, morning);
        index.stats.evening_duplicates = insert_last_wins(&mut index.evening, evening);

        for transfer in transfers {
            let entry = index.transfers.entry(transfer.key()).or_default();
            if entry.entries > 0 {
                index.stats.transfers_merged += 1;
            }
            entry.merge(&transfer)?;
        }

        Ok(index)
    }

    /// Union of keys across the three maps, in presentation order.
    pub fn keys(&self) -> BTreeSet<&RecordKey> {
        self.morning
            .keys()
            .chain(self.evening.keys())
            .chain(self.transfers.keys())
            .collect()
    }

    pub fn morning_qty(&self, key: &RecordKey) -> Quantity {
        self.morning.get(key).map(|r| r.quantity).unwrap_or_default()
    }

    pub fn evening_qty(&self, key: &RecordKey) -> Quantity {
        self.evening.get(key).map(|r| r.quantity).unwrap_or_default()
    }

    pub fn transfer_qty(&self, key: &RecordKey) -> Quantity {
        self.transfers.get(key).map(|t| t.quantity).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.morning.is_empty() && self.evening.is_empty() && self.transfers.is_empty()
    }
}

/// Inserts records, replacing on key collision. Returns the replacement count.
fn insert_last_wins<I>(map: &mut BTreeMap<RecordKey, StockRecord>, records: I) -> usize
where
    I: IntoIterator<Item = StockRecord>,
{
    records
        .into_iter()
        .filter(|record| map.insert(record.key(), record.clone()).is_some())
        .count()
}

// =============================================================================
// Unit Tests
// =============================================================================
