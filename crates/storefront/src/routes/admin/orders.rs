//! Admin order management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use shopeasy_core::{Order, OrderId, OrderStatus};

use crate::error::Result;
use crate::filters;
use crate::middleware::{CspNonce, PageContext, RequireAdmin};
use crate::models::Flash;
use crate::routes::orders::OrderSummaryView;
use crate::services::flash;
use crate::state::AppState;

/// Status option in a row's picker.
#[derive(Clone)]
pub struct StatusOption {
    pub value: &'static str,
    pub selected: bool,
}

/// One row in the admin order table.
#[derive(Clone)]
pub struct AdminOrderRow {
    pub summary: OrderSummaryView,
    pub statuses: Vec<StatusOption>,
}

impl From<&Order> for AdminOrderRow {
    fn from(order: &Order) -> Self {
        Self {
            summary: OrderSummaryView::from(order),
            statuses: OrderStatus::ALL
                .into_iter()
                .map(|status| StatusOption {
                    value: status.as_str(),
                    selected: status == order.status,
                })
                .collect(),
        }
    }
}

/// Search query.
#[derive(Debug, Default, Deserialize)]
pub struct OrderSearch {
    #[serde(default)]
    pub search: String,
}

/// Status change form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
    #[serde(default)]
    pub search: String,
}

/// Admin orders template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct AdminOrdersTemplate {
    pub page: PageContext,
    pub active: &'static str,
    pub search: String,
    pub rows: Vec<AdminOrderRow>,
    pub total: usize,
}

fn orders_url(search: &str) -> String {
    let search = search.trim();
    if search.is_empty() {
        "/admin/orders".to_string()
    } else {
        format!("/admin/orders?search={}", urlencoding::encode(search))
    }
}

/// Display every order, filtered by customer email or order ID.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    RequireAdmin(auth): RequireAdmin,
    Query(query): Query<OrderSearch>,
) -> Result<impl IntoResponse> {
    let orders = match state.api().all_orders(&auth.token).await {
        Ok(orders) => orders,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch orders");
            flash::push(&session, Flash::error("Failed to fetch orders")).await?;
            Vec::new()
        }
    };

    let rows = orders
        .iter()
        .filter(|order| order.matches_search(&query.search))
        .map(AdminOrderRow::from)
        .collect();

    let page = PageContext::for_user(&state, &session, &nonce, Some(&auth)).await?;
    Ok(AdminOrdersTemplate {
        page,
        active: "orders",
        search: query.search.trim().to_owned(),
        rows,
        total: orders.len(),
    })
}

/// Move an order to another status.
#[instrument(skip_all, fields(order_id = %id, status = %form.status))]
pub async fn update_status(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(auth): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Response> {
    let back = orders_url(&form.search);
    let Ok(status) = form.status.parse::<OrderStatus>() else {
        return Ok(flash::redirect(&session, Flash::error("Unknown order status"), &back).await?);
    };

    let notice = match state
        .api()
        .update_order_status(&auth.token, &OrderId::new(id), status)
        .await
    {
        Ok(response) => {
            tracing::info!(status = status.as_str(), "Order status updated");
            Flash::success(response.or("Order updated"))
        }
        Err(e) => Flash::error(e.user_message("Update failed")),
    };
    Ok(flash::redirect(&session, notice, &back).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_url_keeps_search() {
        assert_eq!(orders_url("  "), "/admin/orders");
        assert_eq!(orders_url("a@b.co"), "/admin/orders?search=a%40b.co");
    }
}
