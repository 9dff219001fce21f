//! Cart summary kept alongside the session.
//!
//! The navigation badge needs the item count on every page, but the backend
//! owns the cart. [`CartState`] holds the last known server snapshot plus a
//! `confirmed` flag: optimistic changes flip it off, and the next page render
//! refetches `GET /api/cart/all` to reconcile.

use serde::{Deserialize, Serialize};

use crate::types::{CartItem, CartSnapshot, Price};

/// Local view of the signed-in user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartState {
    items: Vec<CartItem>,
    total_quantity: u32,
    sub_total: Price,
    confirmed: bool,
}

impl CartState {
    /// State matching a fresh server snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: CartSnapshot) -> Self {
        let mut state = Self::default();
        state.reconcile(snapshot);
        state
    }

    /// Record an add the backend acknowledged but has not echoed back yet.
    ///
    /// Bumps the count by one and, when the backend reported a unit price,
    /// the subtotal by that amount. The state stays unconfirmed until the
    /// next [`reconcile`](Self::reconcile).
    pub fn apply_optimistic_add(&mut self, unit_price: Option<Price>) {
        self.total_quantity = self.total_quantity.saturating_add(1);
        if let Some(price) = unit_price {
            self.sub_total = self.sub_total + price;
        }
        self.confirmed = false;
    }

    /// Replace everything with the server's snapshot.
    pub fn reconcile(&mut self, snapshot: CartSnapshot) {
        self.items = snapshot.items;
        self.total_quantity = snapshot.total_quantity;
        self.sub_total = snapshot.sub_total;
        self.confirmed = true;
    }

    /// Flag the summary for refetch without touching the numbers.
    pub const fn mark_stale(&mut self) {
        self.confirmed = false;
    }

    /// Forget the cart (logout, or after an order is placed).
    pub fn clear(&mut self) {
        *self = Self {
            confirmed: true,
            ..Self::default()
        };
    }

    /// Lines from the last snapshot.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Count shown in the navigation badge.
    #[must_use]
    pub const fn total_quantity(&self) -> u32 {
        self.total_quantity
    }

    /// Subtotal of all lines.
    #[must_use]
    pub const fn sub_total(&self) -> Price {
        self.sub_total
    }

    /// Whether the numbers match the server's last answer.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_quantity == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn snapshot(quantity: u32, sub_total: i64) -> CartSnapshot {
        CartSnapshot {
            items: Vec::new(),
            total_quantity: quantity,
            sub_total: Price::new(Decimal::from(sub_total)),
        }
    }

    #[test]
    fn test_default_is_unconfirmed_and_empty() {
        let state = CartState::default();
        assert!(state.is_empty());
        assert!(!state.is_confirmed());
    }

    #[test]
    fn test_optimistic_add_bumps_count_and_subtotal() {
        let mut state = CartState::from_snapshot(snapshot(2, 500));
        state.apply_optimistic_add(Some(Price::new(Decimal::from(120))));

        assert_eq!(state.total_quantity(), 3);
        assert_eq!(state.sub_total().amount(), Decimal::from(620));
        assert!(!state.is_confirmed());
    }

    #[test]
    fn test_optimistic_add_without_price_keeps_subtotal() {
        let mut state = CartState::from_snapshot(snapshot(1, 100));
        state.apply_optimistic_add(None);
        assert_eq!(state.total_quantity(), 2);
        assert_eq!(state.sub_total().amount(), Decimal::from(100));
    }

    #[test]
    fn test_reconcile_overrides_optimistic_guess() {
        let mut state = CartState::from_snapshot(snapshot(1, 100));
        state.apply_optimistic_add(Some(Price::new(Decimal::from(50))));
        // Server says the add merged into an existing line.
        state.reconcile(snapshot(1, 150));

        assert_eq!(state.total_quantity(), 1);
        assert_eq!(state.sub_total().amount(), Decimal::from(150));
        assert!(state.is_confirmed());
    }

    #[test]
    fn test_mark_stale_keeps_numbers() {
        let mut state = CartState::from_snapshot(snapshot(4, 400));
        state.mark_stale();
        assert_eq!(state.total_quantity(), 4);
        assert!(!state.is_confirmed());
    }

    #[test]
    fn test_clear_empties_and_confirms() {
        let mut state = CartState::from_snapshot(snapshot(4, 400));
        state.clear();
        assert!(state.is_empty());
        assert!(state.items().is_empty());
        assert!(state.is_confirmed());
    }

    #[test]
    fn test_session_round_trip() {
        let mut state = CartState::from_snapshot(snapshot(2, 300));
        state.apply_optimistic_add(None);
        let json = serde_json::to_string(&state).unwrap();
        let restored: CartState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }
}
