//! # Period Module
//!
//! Calendar date parsing and inclusive date ranges.
//!
//! ## Accepted Date Inputs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "2025-01-03"   ISO (date pickers, API payloads)                        │
//! │  "03/01/2025"   DD/MM/YYYY (stock sheets, French locale)                │
//! │  "03-01-2025"   DD-MM-YYYY (older transfer exports)                     │
//! │                                                                         │
//! │  Anything else is rejected BEFORE any fetching happens.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use etal_core::period::Period;
//!
//! let period = Period::parse("2025-01-01", "03/01/2025").unwrap();
//! let days: Vec<String> = period.dates().iter().map(|d| d.to_string()).collect();
//! assert_eq!(days, ["2025-01-01", "2025-01-02", "2025-01-03"]);
//! ```

use std::fmt::Write;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::validation::ValidationResult;

/// Formats tried in order when parsing a calendar date.
const ACCEPTED_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

// =============================================================================
// Parsing
// =============================================================================

/// Parses a calendar date from any accepted representation.
///
/// A trailing time component (`2025-01-03T00:00:00.000Z`) is ignored, since
/// upstream date-only columns are sometimes serialized as timestamps.
pub fn parse_calendar_date(field: &str, input: &str) -> ValidationResult<NaiveDate> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    let date_part = trimmed.split(['T', ' ']).next().unwrap_or(trimmed);

    ACCEPTED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .ok_or_else(|| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!(
                "'{}' is not a date (expected YYYY-MM-DD or DD/MM/YYYY)",
                trimmed
            ),
        })
}

// =============================================================================
// Rendering
// =============================================================================

/// Renders a date with a chrono format string.
///
/// Returns `None` when the format cannot be applied to a bare date: an
/// unknown specifier, or a time/zone field such as `%H` or `%z`.
pub fn render_date(date: NaiveDate, format: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", date.format(format)).ok()?;
    Some(out)
}

/// Checks that `format` renders a calendar date.
pub fn validate_date_format(field: &str, format: &str) -> ValidationResult<()> {
    if format.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    let sample = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap_or_default();
    match render_date(sample, format) {
        Some(_) => Ok(()),
        None => Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("'{}' cannot render a calendar date", format),
        }),
    }
}

// =============================================================================
// Date Range
// =============================================================================

/// Every calendar date from `start` to `end`, both included, ascending.
///
/// Returns an empty vector when `start > end`; callers validate the order
/// through [`Period::new`] first.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

// =============================================================================
// Period
// =============================================================================

/// A validated, inclusive reconciliation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    #[ts(as = "String")]
    start: NaiveDate,
    #[ts(as = "String")]
    end: NaiveDate,
}

impl Period {
    /// Creates a period, rejecting a start date after the end date.
    pub fn new(start: NaiveDate, end: NaiveDate) -> ValidationResult<Self> {
        if start > end {
            return Err(ValidationError::ReversedPeriod { start, end });
        }
        Ok(Period { start, end })
    }

    /// A one-day period.
    pub fn single(date: NaiveDate) -> Self {
        Period {
            start: date,
            end: date,
        }
    }

    /// Parses both bounds, then validates their order.
    pub fn parse(start: &str, end: &str) -> ValidationResult<Self> {
        let start = parse_calendar_date("startDate", start)?;
        let end = parse_calendar_date("endDate", end)?;
        Period::new(start, end)
    }

    #[inline]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[inline]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered (always >= 1).
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// All dates in the period.
    pub fn dates(&self) -> Vec<NaiveDate> {
        date_range(self.start, self.end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
