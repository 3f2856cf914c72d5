//! # Error Types
//!
//! Domain-specific error types for etal-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  etal-core errors (this file)                                          │
//! │  ├── CoreError        - Record ingestion failures, quantity overflow   │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  etal-source errors (separate crate)                                   │
//! │  └── SourceError      - Data API failures                              │
//! │                                                                         │
//! │  etal-recon errors (separate crate)                                    │
//! │  └── ReconError       - Run-level failures (bad dates, export, ...)    │
//! │                                                                         │
//! │  Flow: ValidationError → ReconError → ApiError → Frontend              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Negative theoretical sales are NOT errors. They never appear here.

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::RecordKind;

// =============================================================================
// Core Error
// =============================================================================

/// Errors raised while turning upstream JSON into canonical records, or
/// while adding up their quantities.
///
/// A record that fails normalization is rejected from the run and counted;
/// the rest of the run continues. An overflow fails the whole pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// The upstream value is not a JSON object.
    #[error("{kind} record is not a JSON object")]
    NotAnObject { kind: RecordKind },

    /// A key field (outlet, product, date) is absent or blank.
    #[error("{kind} record is missing {field}")]
    MissingField {
        kind: RecordKind,
        field: &'static str,
    },

    /// The record carries a date we cannot read and no fetch date is known.
    #[error("{kind} record has unparseable date '{value}'")]
    InvalidRecordDate { kind: RecordKind, value: String },

    /// A sum or difference left the decimal range.
    #[error("quantity {operation} overflowed")]
    Overflow { operation: &'static str },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any fetching begins, so a bad request never costs an
/// upstream call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., unparseable date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Start date falls after end date.
    #[error("start date {start} is after end date {end}")]
    ReversedPeriod { start: NaiveDate, end: NaiveDate },

    /// Period spans more days than allowed.
    #[error("period of {days} days exceeds the maximum of {max} days")]
    PeriodTooLong { days: i64, max: i64 },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
