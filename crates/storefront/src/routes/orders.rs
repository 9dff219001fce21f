//! Order history route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use shopeasy_core::{Order, OrderId, OrderItem};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{CspNonce, PageContext, RequireAuth};
use crate::models::Flash;
use crate::services::flash;
use crate::state::AppState;

/// One row in an order list.
#[derive(Clone)]
pub struct OrderSummaryView {
    pub id: String,
    pub placed_on: String,
    pub status: String,
    pub status_class: &'static str,
    pub method: &'static str,
    pub total: String,
    pub item_count: u32,
    pub customer: String,
}

impl From<&Order> for OrderSummaryView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            placed_on: order.created_at.format("%d %b %Y").to_string(),
            status: order.status.to_string(),
            status_class: order.status.badge_class(),
            method: order.method.label(),
            total: order.sub_total.to_string(),
            item_count: order.item_count(),
            customer: order
                .user
                .as_ref()
                .and_then(|user| user.email())
                .unwrap_or("-")
                .to_owned(),
        }
    }
}

/// One purchased line on the order page.
#[derive(Clone)]
pub struct OrderLineView {
    pub product_id: String,
    pub title: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<&OrderItem> for OrderLineView {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product.id.to_string(),
            title: item.product.title.clone(),
            image: item.product.thumbnail().map(String::from),
            quantity: item.quantity,
            unit_price: item.product.price.to_string(),
            line_total: item.product.price.times(item.quantity).to_string(),
        }
    }
}

/// Order list template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub page: PageContext,
    pub orders: Vec<OrderSummaryView>,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub page: PageContext,
    pub order: OrderSummaryView,
    pub lines: Vec<OrderLineView>,
    pub address: String,
    pub phone: String,
    pub placed_at: String,
}

/// Shown when the order belongs to someone else.
#[derive(Template, WebTemplate)]
#[template(path = "orders/unauthorized.html")]
pub struct UnauthorizedTemplate {
    pub page: PageContext,
}

/// Whether `viewer` may open `order`.
fn can_view(order: &Order, viewer: &crate::models::CurrentUser) -> bool {
    viewer.is_admin() || order.belongs_to(&viewer.id)
}

/// Display the signed-in user's orders.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    RequireAuth(auth): RequireAuth,
) -> Result<impl IntoResponse> {
    let orders = match state.api().orders(&auth.token).await {
        Ok(orders) => orders.iter().map(OrderSummaryView::from).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load orders");
            flash::push(&session, Flash::error(e.user_message("Failed to load orders"))).await?;
            Vec::new()
        }
    };

    let page = PageContext::for_user(&state, &session, &nonce, Some(&auth)).await?;
    Ok(OrdersTemplate { page, orders })
}

/// Display one order, if the viewer owns it or is an admin.
#[instrument(skip_all, fields(user_id = %auth.user.id, order_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let order = match state.api().order(&auth.token, &OrderId::new(id)).await {
        Ok(order) => order,
        Err(e) if e.is_not_found() || e.is_client_error() => {
            return Err(AppError::NotFound("order".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let page = PageContext::for_user(&state, &session, &nonce, Some(&auth)).await?;

    if !can_view(&order, &auth.user) {
        tracing::warn!(order_id = %order.id, "Order viewed by someone other than its owner");
        return Ok((StatusCode::FORBIDDEN, UnauthorizedTemplate { page }).into_response());
    }

    Ok(OrderShowTemplate {
        page,
        order: OrderSummaryView::from(&order),
        lines: order.items.iter().map(OrderLineView::from).collect(),
        placed_at: order.created_at.format("%d %b %Y, %H:%M UTC").to_string(),
        address: order.address,
        phone: order.phone,
    }
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopeasy_core::{Email, Role, UserId};

    use super::*;
    use crate::models::CurrentUser;

    fn order_for(user_id: &str) -> Order {
        serde_json::from_value(serde_json::json!({
            "_id": "o1",
            "items": [{"product": {"_id": "p1", "title": "Mug", "price": 250}, "quantity": 3}],
            "subTotal": 750,
            "status": "Shipped",
            "method": "online",
            "createdAt": "2025-03-02T08:00:00Z",
            "user": {"_id": user_id, "email": "owner@shop.test"}
        }))
        .unwrap()
    }

    fn viewer(id: &str, role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse("viewer@shop.test").unwrap(),
            role,
        }
    }

    #[test]
    fn test_owner_and_admin_can_view() {
        let order = order_for("u1");
        assert!(can_view(&order, &viewer("u1", Role::User)));
        assert!(can_view(&order, &viewer("admin", Role::Admin)));
        assert!(!can_view(&order, &viewer("u2", Role::User)));
    }

    #[test]
    fn test_summary_view() {
        let view = OrderSummaryView::from(&order_for("u1"));
        assert_eq!(view.item_count, 3);
        assert_eq!(view.placed_on, "02 Mar 2025");
        assert_eq!(view.status, "Shipped");
        assert_eq!(view.method, "Online Payment");
        assert_eq!(view.customer, "owner@shop.test");
    }

    #[test]
    fn test_line_total() {
        let order = order_for("u1");
        let line = OrderLineView::from(order.items.first().unwrap());
        assert_eq!(line.line_total, "₹750.00");
    }
}
