//! Cart records mirrored from `GET /api/cart/all`.

use serde::{Deserialize, Serialize};

use super::{CartItemId, Price, Product};

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub id: CartItemId,
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// The server's authoritative view of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartSnapshot {
    #[serde(rename = "cart", default)]
    pub items: Vec<CartItem>,
    #[serde(rename = "sumOfQuantities", default)]
    pub total_quantity: u32,
    #[serde(rename = "subTotal", default)]
    pub sub_total: Price,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_snapshot_wire_format() {
        let snapshot: CartSnapshot = serde_json::from_str(
            r#"{
                "cart": [{"_id":"c1","quantity":2,"product":{"_id":"p1","title":"Mug","price":250}}],
                "sumOfQuantities": 2,
                "subTotal": 500
            }"#,
        )
        .unwrap();

        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.total_quantity, 2);
        assert_eq!(snapshot.sub_total.amount(), Decimal::from(500));
        assert_eq!(snapshot.items[0].line_total().amount(), Decimal::from(500));
    }

    #[test]
    fn test_empty_body_is_empty_cart() {
        let snapshot: CartSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snapshot, CartSnapshot::default());
    }
}
