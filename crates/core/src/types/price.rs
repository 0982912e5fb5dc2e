//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are non-negative amounts with at most two fractional digits. All
//! arithmetic stays in [`Decimal`], so a cart total accumulated over many
//! additions never drifts the way a binary float would.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
    /// The amount has more than two fractional digits.
    #[error("price must have at most {max} decimal places: {amount}")]
    TooPrecise {
        /// The rejected amount.
        amount: Decimal,
        /// Maximum number of fractional digits.
        max: u32,
    },
}

/// A price in the store currency.
///
/// ## Examples
///
/// ```
/// use furni_core::Price;
///
/// let chair = Price::from_cents(19_999);
/// assert_eq!(chair.to_string(), "$199.99");
/// assert_eq!(chair.checked_mul(3).unwrap(), Price::from_cents(59_997));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Number of fractional digits a price may carry.
    pub const SCALE: u32 = 2;

    /// A zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative or has more than two
    /// significant fractional digits.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        let normalized = amount.normalize();
        if normalized.scale() > Self::SCALE {
            return Err(PriceError::TooPrecise {
                amount,
                max: Self::SCALE,
            });
        }
        Ok(Self(normalized))
    }

    /// Create a price from a whole number of cents.
    ///
    /// Negative inputs are clamped to zero.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents.max(0), Self::SCALE).normalize())
    }

    /// Get the decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns `true` if the price is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Multiply by a quantity, returning `None` on overflow.
    #[must_use]
    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(quantity)).map(Self)
    }

    /// Add two prices, returning `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Percentage saved relative to an original price, rounded down.
    ///
    /// Returns `None` when `original` is not higher than `self`.
    #[must_use]
    pub fn discount_percent_from(self, original: Self) -> Option<u8> {
        if original.0 <= self.0 || original.is_zero() {
            return None;
        }
        let pct = (original.0 - self.0) * Decimal::ONE_HUNDRED / original.0;
        u8::try_from(pct.trunc().mantissa()).ok()
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fixed = format!("{:.2}", self.0);
        let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, digit) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        write!(f, "${grouped}.{cents}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_negative() {
        assert!(matches!(
            Price::new(Decimal::new(-1, 2)),
            Err(PriceError::Negative(_))
        ));
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_new_rejects_sub_cent_amounts() {
        assert!(matches!(
            Price::new(Decimal::new(1005, 3)),
            Err(PriceError::TooPrecise { max: 2, .. })
        ));
        // Trailing zeros are not significant.
        assert_eq!(
            Price::new(Decimal::new(19_900, 3)).unwrap(),
            Price::from_cents(1990)
        );
    }

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Price::from_cents(7_900).to_string(), "$79.00");
        assert_eq!(Price::from_cents(129_900).to_string(), "$1,299.00");
        assert_eq!(Price::from_cents(123_456_789).to_string(), "$1,234,567.89");
        assert_eq!(Price::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn test_sum_is_exact() {
        let total: Price = std::iter::repeat_n(Price::from_cents(10), 10).sum();
        assert_eq!(total, Price::from_cents(100));
    }

    #[test]
    fn test_discount_percent_from() {
        let price = Price::from_cents(19_900);
        assert_eq!(price.discount_percent_from(Price::from_cents(29_900)), Some(33));
        assert_eq!(price.discount_percent_from(price), None);
    }

    #[test]
    fn test_serde_uses_string_decimal() {
        let price = Price::from_cents(89_900);
        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(json, "\"899\"");
        let parsed: Price = serde_json::from_str("\"899.00\"").unwrap();
        assert_eq!(parsed, price);
        assert!(serde_json::from_str::<Price>("\"-5\"").is_err());
    }
}
