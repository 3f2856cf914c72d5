//! # etal-core: Pure Reconciliation Logic
//!
//! Turns raw morning stock, evening stock and transfer records into
//! theoretical sales per (date, outlet, product), as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Étal Architecture                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  apps/recon-api (axum)                          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        etal-recon (fetch fan-out, service, export)              │   │
//! │  └──────────────┬──────────────────────────────────┬───────────────┘   │
//! │                 │ raw JSON                         │                    │
//! │  ┌──────────────▼──────────────┐   ┌───────────────▼───────────────┐   │
//! │  │  etal-source (data API)     │   │  ★ etal-core (THIS CRATE) ★   │   │
//! │  └─────────────────────────────┘   │                               │   │
//! │                                    │  period ─► normalize ─►       │   │
//! │                                    │  aggregate ─► reconcile ─►    │   │
//! │                                    │  present                      │   │
//! │                                    │                               │   │
//! │                                    │  NO I/O • NO CLOCK • PURE     │   │
//! │                                    └───────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`quantity`] - Decimal quantity type (no floating point!)
//! - [`types`] - Record shapes and the composite key
//! - [`period`] - Calendar date parsing and inclusive date ranges
//! - [`normalize`] - Upstream JSON → canonical records
//! - [`aggregate`] - Keyed maps (last-write-wins stock, summed transfers)
//! - [`reconcile`] - Theoretical sales and the full pure pipeline
//! - [`present`] - Filtering, ordering, summary
//! - [`validation`] - Request validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use etal_core::{reconcile_records, RawRecord, RecordFilter};
//! use serde_json::json;
//!
//! let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
//! let morning = [RawRecord::new(day, json!({ "pointVente": "Mbao", "produit": "Boeuf", "quantite": 10 }))];
//! let evening = [RawRecord::new(day, json!({ "pointVente": "Mbao", "produit": "Boeuf", "quantite": 4 }))];
//!
//! let result = reconcile_records(&morning, &evening, &[], &RecordFilter::default()).unwrap();
//! assert_eq!(result.rows[0].theoretical_sales.to_string(), "-6");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod error;
pub mod normalize;
pub mod period;
pub mod present;
pub mod quantity;
pub mod reconcile;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use aggregate::{AggregationStats, KeyedIndex, TransferTotal};
pub use error::{CoreError, CoreResult, ValidationError};
pub use period::{date_range, parse_calendar_date, render_date, validate_date_format, Period};
pub use present::{sort_rows, RecordFilter, ReconSummary};
pub use quantity::Quantity;
pub use reconcile::{consolidate, reconcile_records, theoretical_sales, Reconciliation};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Longest period a single request may cover, in days.
///
/// ## Business Reason
/// A full year of daily reconciliations is the longest report anyone asks
/// for; beyond that, a typo in the year is the likelier explanation.
pub const DEFAULT_MAX_PERIOD_DAYS: i64 = 366;

/// Maximum length of an outlet or product filter value.
pub const MAX_FILTER_LENGTH: usize = 100;
