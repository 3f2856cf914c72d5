//! # Validation Module
//!
//! Request validation, run before any upstream call is made.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Frontend (date pickers, dropdowns)                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: HTTP handler (query deserialization)                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: THIS MODULE                                                  │
//! │  ├── dates parse as calendar dates (period module)                     │
//! │  ├── start <= end (period module)                                      │
//! │  ├── period length bounded                                             │
//! │  └── filter values bounded                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use etal_core::period::Period;
//! use etal_core::validation::{validate_filter_value, validate_period};
//!
//! let period = Period::parse("2025-01-01", "2025-01-31").unwrap();
//! validate_period(&period, 366).unwrap();
//! validate_filter_value("outlet", "Mbao").unwrap();
//! ```

use crate::error::ValidationError;
use crate::period::Period;
use crate::MAX_FILTER_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Rejects periods longer than `max_days` calendar days.
///
/// Each day costs three upstream calls, so an unbounded period is an easy
/// way to flood the data API.
pub fn validate_period(period: &Period, max_days: i64) -> ValidationResult<()> {
    let days = period.len_days();
    if days > max_days {
        return Err(ValidationError::PeriodTooLong {
            days,
            max: max_days,
        });
    }
    Ok(())
}

/// Validates an outlet or product filter value.
///
/// Blank is valid (it means no restriction).
pub fn validate_filter_value(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().chars().count() > MAX_FILTER_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_FILTER_LENGTH,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_period_length() {
        let period = Period::parse("2025-01-01", "2025-01-31").unwrap();
        assert!(validate_period(&period, 31).is_ok());
        assert_eq!(
            validate_period(&period, 30),
            Err(ValidationError::PeriodTooLong { days: 31, max: 30 })
        );
    }

    #[test]
    fn test_validate_filter_value() {
        assert!(validate_filter_value("outlet", "").is_ok());
        assert!(validate_filter_value("outlet", "Mbao").is_ok());
        assert!(validate_filter_value("outlet", &"é".repeat(MAX_FILTER_LENGTH)).is_ok());
        assert!(matches!(
            validate_filter_value("product", &"x".repeat(MAX_FILTER_LENGTH + 1)),
            Err(ValidationError::TooLong { .. })
        ));
    }
}
