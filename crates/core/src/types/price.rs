//! Type-safe price representation using decimal arithmetic.
//!
//! The backend sends prices as bare JSON numbers in rupees. They are kept as
//! [`Decimal`] so subtotals never pick up floating point noise.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// The raw amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Whether the amount is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Format for display in the given currency, e.g. `₹1299.00`.
    #[must_use]
    pub fn display_in(&self, currency: CurrencyCode) -> String {
        format!("{}{:.2}", currency.symbol(), self.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_in(CurrencyCode::default()))
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

/// ISO 4217 currency codes the storefront can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
}

impl CurrencyCode {
    /// Symbol printed before the amount.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_json_numbers() {
        let price: Price = serde_json::from_str("1299").unwrap();
        assert_eq!(price.amount(), Decimal::from(1299));

        let price: Price = serde_json::from_str("49.5").unwrap();
        assert_eq!(price.amount(), Decimal::new(495, 1));
    }

    #[test]
    fn test_display_uses_rupees() {
        let price = Price::new(Decimal::new(49_950, 2));
        assert_eq!(price.to_string(), "₹499.50");
        assert_eq!(price.display_in(CurrencyCode::USD), "$499.50");
    }

    #[test]
    fn test_times_and_sum() {
        let unit = Price::new(Decimal::new(1999, 2));
        let total: Price = [unit.times(2), unit].into_iter().sum();
        assert_eq!(total.amount(), Decimal::new(5997, 2));
    }
}
