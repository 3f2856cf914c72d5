//! # Quantity Module
//!
//! Provides the `Quantity` type for stock counts and transfer volumes.
//!
//! ## Why Decimal?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Weighed goods are fractional: 12.35 kg of beef, 0.7 kg of liver.      │
//! │                                                                         │
//! │  With f64:                                                              │
//! │    12.35 - (10.2 + 2.15) = -0.0000000000000017763568394002505  ❌      │
//! │    → a phantom shortfall on a perfectly balanced day                   │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal                                             │
//! │    12.35 - (10.2 + 2.15) = 0                                 ✅        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Arithmetic
//! Sums and differences go through [`Quantity::checked_add`] and
//! [`Quantity::checked_sub`]. A result outside the decimal range is a
//! [`CoreError::Overflow`], never a panic.
//!
//! ## Lenient Parsing
//! Upstream payloads carry quantities as numbers, numeric strings, French
//! decimal strings ("2,5"), empty strings or nothing at all. Everything that
//! is not a number becomes zero, never NaN and never null.
//!
//! ```rust
//! use etal_core::quantity::Quantity;
//! use serde_json::json;
//!
//! assert_eq!(Quantity::parse_lenient(Some(&json!("2,5"))).to_string(), "2.5");
//! assert!(Quantity::parse_lenient(Some(&json!(""))).is_zero());
//! assert!(Quantity::parse_lenient(None).is_zero());
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::ops::Neg;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Quantity Type
// =============================================================================

/// A signed decimal quantity (units or kilograms).
///
/// Negative values are legitimate: corrections on stock sheets, outbound
/// transfers, and shortfalls in theoretical sales.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export)]
pub struct Quantity(#[ts(type = "string")] Decimal);

impl Quantity {
    /// Wraps a decimal value.
    #[inline]
    pub const fn from_decimal(value: Decimal) -> Self {
        Quantity(value)
    }

    /// Zero quantity.
    #[inline]
    pub const fn zero() -> Self {
        Quantity(Decimal::ZERO)
    }

    /// Returns the underlying decimal.
    #[inline]
    pub const fn decimal(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// True when strictly below zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// True when strictly above zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(&self) -> Self {
        Quantity(self.0.abs())
    }

    /// `self + other`, or [`CoreError::Overflow`] outside the decimal range.
    #[inline]
    pub fn checked_add(self, other: Self) -> CoreResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Quantity)
            .ok_or(CoreError::Overflow { operation: "addition" })
    }

    /// `self - other`, or [`CoreError::Overflow`] outside the decimal range.
    #[inline]
    pub fn checked_sub(self, other: Self) -> CoreResult<Self> {
        self.0
            .checked_sub(other.0)
            .map(Quantity)
            .ok_or(CoreError::Overflow {
                operation: "subtraction",
            })
    }

    /// Sums quantities, stopping at the first overflow.
    pub fn checked_sum<I>(quantities: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = Quantity>,
    {
        quantities
            .into_iter()
            .try_fold(Quantity::zero(), Quantity::checked_add)
    }

    /// Parses a quantity out of an arbitrary JSON value.
    ///
    /// ## Accepted Inputs
    /// ```text
    /// 12          → 12
    /// 12.5        → 12.5
    /// "12.5"      → 12.5
    /// " 12,5 "    → 12.5
    /// "1e2"       → 100
    /// ""          → 0
    /// "abc"       → 0
    /// null        → 0
    /// (absent)    → 0
    /// true/[]/{}  → 0
    /// ```
    pub fn parse_lenient(value: Option<&Value>) -> Self {
        let decimal = match value {
            Some(Value::Number(n)) => parse_decimal(&n.to_string()),
            Some(Value::String(s)) => parse_decimal(s),
            _ => None,
        };
        Quantity(decimal.unwrap_or(Decimal::ZERO))
    }
}

/// Parses a decimal string, tolerating a comma separator and inner spaces.
pub(crate) fn parse_decimal(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Displays the normalized decimal ("2.50" renders as "2.5").
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl From<Decimal> for Quantity {
    fn from(value: Decimal) -> Self {
        Quantity(value)
    }
}

impl From<i64> for Quantity {
    fn from(value: i64) -> Self {
        Quantity(Decimal::from(value))
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn qty(s: &str) -> Quantity {
        Quantity::from_decimal(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_parse_lenient_numbers() {
        assert_eq!(Quantity::parse_lenient(Some(&json!(12))), qty("12"));
        assert_eq!(Quantity::parse_lenient(Some(&json!(12.5))), qty("12.5"));
        assert_eq!(Quantity::parse_lenient(Some(&json!(-3))), qty("-3"));
    }

    #[test]
    fn test_parse_lenient_strings() {
        assert_eq!(Quantity::parse_lenient(Some(&json!("12.5"))), qty("12.5"));
        assert_eq!(Quantity::parse_lenient(Some(&json!(" 12,5 "))), qty("12.5"));
        assert_eq!(Quantity::parse_lenient(Some(&json!("1 200"))), qty("1200"));
        assert_eq!(Quantity::parse_lenient(Some(&json!("1e2"))), qty("100"));
    }

    #[test]
    fn test_parse_lenient_garbage_is_zero() {
        assert!(Quantity::parse_lenient(None).is_zero());
        assert!(Quantity::parse_lenient(Some(&Value::Null)).is_zero());
        assert!(Quantity::parse_lenient(Some(&json!(""))).is_zero());
        assert!(Quantity::parse_lenient(Some(&json!("n/a"))).is_zero());
        assert!(Quantity::parse_lenient(Some(&json!(true))).is_zero());
        assert!(Quantity::parse_lenient(Some(&json!([1, 2]))).is_zero());
    }

    #[test]
    fn test_decimal_arithmetic_is_exact() {
        // The classic float trap: balanced day must come out at exactly zero
        let evening = qty("12.35");
        let morning = qty("10.2");
        let transfer = qty("2.15");
        let moved = morning.checked_add(transfer).unwrap();
        assert!(evening.checked_sub(moved).unwrap().is_zero());
    }

    #[test]
    fn test_overflow_is_an_error() {
        let max = Quantity::from_decimal(Decimal::MAX);
        let min = Quantity::from_decimal(Decimal::MIN);
        assert!(matches!(
            max.checked_add(qty("1")),
            Err(CoreError::Overflow { operation: "addition" })
        ));
        assert!(matches!(
            min.checked_sub(qty("1")),
            Err(CoreError::Overflow { .. })
        ));
        assert_eq!(max.checked_sub(qty("1")).unwrap(), Quantity::from_decimal(Decimal::MAX - Decimal::ONE));
    }

    #[test]
    fn test_sign_checks() {
        assert!(qty("-0.5").is_negative());
        assert!(!qty("0").is_negative());
        assert!(!qty("0").is_positive());
        assert!(qty("0.5").is_positive());
        assert_eq!(qty("-2").abs(), qty("2"));
        assert_eq!(-qty("2"), qty("-2"));
    }

    #[test]
    fn test_display_is_normalized() {
        assert_eq!(qty("2.50").to_string(), "2.5");
        assert_eq!(qty("-5").to_string(), "-5");
        assert_eq!(Quantity::zero().to_string(), "0");
    }

    #[test]
    fn test_checked_sum() {
        let total = Quantity::checked_sum([qty("1.5"), qty("2"), qty("-0.5")]).unwrap();
        assert_eq!(total, qty("3"));
        assert!(Quantity::checked_sum(Vec::new()).unwrap().is_zero());

        let max = Quantity::from_decimal(Decimal::MAX);
        assert!(Quantity::checked_sum([max, qty("-1"), max]).is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&qty("2.5")).unwrap();
        assert_eq!(json, "\"2.5\"");
        let back: Quantity = serde_json::from_str("\"2.5\"").unwrap();
        assert_eq!(back, qty("2.5"));
    }
}
