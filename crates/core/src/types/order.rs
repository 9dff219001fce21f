//! Order records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OrderId, OrderStatus, PaymentMethod, Price, Product, UserId};

/// A purchased line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: Product,
    pub quantity: u32,
}

/// The order's owner. Admin listings populate it, other endpoints may only
/// carry the bare ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderUser {
    Populated {
        #[serde(rename = "_id")]
        id: UserId,
        #[serde(default)]
        email: Option<String>,
    },
    Id(UserId),
}

impl OrderUser {
    /// The owner's ID.
    #[must_use]
    pub const fn id(&self) -> &UserId {
        match self {
            Self::Populated { id, .. } | Self::Id(id) => id,
        }
    }

    /// The owner's email, when populated.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Populated { email, .. } => email.as_deref(),
            Self::Id(_) => None,
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(rename = "subTotal", default)]
    pub sub_total: Price,
    #[serde(default)]
    pub status: OrderStatus,
    pub method: PaymentMethod,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<OrderUser>,
}

impl Order {
    /// Whether `user_id` placed this order.
    #[must_use]
    pub fn belongs_to(&self, user_id: &UserId) -> bool {
        self.user.as_ref().is_some_and(|owner| owner.id() == user_id)
    }

    /// Total number of units across lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Case-insensitive match on the owner's email or the order ID.
    #[must_use]
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let email_hit = self
            .user
            .as_ref()
            .and_then(OrderUser::email)
            .is_some_and(|email| email.to_lowercase().contains(&needle));
        email_hit || self.id.as_str().to_lowercase().contains(&needle)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order(user: &str) -> Order {
        serde_json::from_str(&format!(
            r#"{{
                "_id": "ORD65AB",
                "items": [{{"product": {{"_id": "p1", "title": "Mug", "price": 250}}, "quantity": 2}}],
                "subTotal": 500,
                "status": "Pending",
                "method": "cod",
                "address": "12 MG Road",
                "phone": "9876543210",
                "createdAt": "2025-01-15T10:30:00.000Z",
                "user": {user}
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_populated_user() {
        let order = order(r#"{"_id": "u1", "email": "Buyer@Example.com"}"#);
        assert!(order.belongs_to(&UserId::new("u1")));
        assert_eq!(order.item_count(), 2);
        assert!(order.matches_search("buyer@"));
        assert!(order.matches_search("ord65"));
        assert!(!order.matches_search("someone-else"));
    }

    #[test]
    fn test_bare_user_id() {
        let order = order(r#""u2""#);
        assert!(order.belongs_to(&UserId::new("u2")));
        assert!(!order.belongs_to(&UserId::new("u1")));
        assert!(order.matches_search("  "));
    }
}
