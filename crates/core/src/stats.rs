//! Admin dashboard statistics from `GET /api/stats`.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Units sold for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSales {
    pub title: String,
    #[serde(default)]
    pub sold: u64,
}

/// Order counts per payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaymentBreakdown {
    #[serde(default)]
    pub cod: u64,
    #[serde(default)]
    pub online: u64,
}

impl PaymentBreakdown {
    /// Orders counted across both methods.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.cod.saturating_add(self.online)
    }

    /// Share of cash-on-delivery orders, in percent to two places.
    #[must_use]
    pub fn cod_percent(&self) -> Decimal {
        percent(self.cod, self.total())
    }

    /// Share of online orders, in percent to two places.
    #[must_use]
    pub fn online_percent(&self) -> Decimal {
        percent(self.online, self.total())
    }
}

fn percent(part: u64, total: u64) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(total))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Body of `GET /api/stats`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    #[serde(flatten)]
    pub payments: PaymentBreakdown,
    #[serde(rename = "data", default)]
    pub sales: Vec<ProductSales>,
}

impl Stats {
    /// Sales sorted best-selling first, ties by title.
    #[must_use]
    pub fn top_sellers(&self) -> Vec<&ProductSales> {
        let mut sales: Vec<_> = self.sales.iter().collect();
        sales.sort_by(|a, b| b.sold.cmp(&a.sold).then_with(|| a.title.cmp(&b.title)));
        sales
    }

    /// Largest `sold` value, used to scale the bar chart.
    #[must_use]
    pub fn max_sold(&self) -> u64 {
        self.sales.iter().map(|s| s.sold).max().unwrap_or(0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_percentages_round_to_two_places() {
        let breakdown = PaymentBreakdown { cod: 1, online: 2 };
        assert_eq!(breakdown.cod_percent(), Decimal::from_str("33.33").unwrap());
        assert_eq!(breakdown.online_percent(), Decimal::from_str("66.67").unwrap());
    }

    #[test]
    fn test_no_orders_is_zero_percent() {
        let breakdown = PaymentBreakdown::default();
        assert_eq!(breakdown.total(), 0);
        assert_eq!(breakdown.cod_percent(), Decimal::ZERO);
        assert_eq!(breakdown.online_percent(), Decimal::ZERO);
    }

    #[test]
    fn test_stats_wire_format() {
        let stats: Stats = serde_json::from_str(
            r#"{"cod":3,"online":1,"data":[{"title":"Mug","sold":4},{"title":"Cap","sold":9}]}"#,
        )
        .unwrap();
        assert_eq!(stats.payments.total(), 4);
        assert_eq!(stats.payments.cod_percent(), Decimal::from(75));
        assert_eq!(stats.max_sold(), 9);
        assert_eq!(stats.top_sellers()[0].title, "Cap");
    }

    #[test]
    fn test_missing_fields_default() {
        let stats: Stats = serde_json::from_str("{}").unwrap();
        assert_eq!(stats, Stats::default());
        assert_eq!(stats.max_sold(), 0);
    }
}
