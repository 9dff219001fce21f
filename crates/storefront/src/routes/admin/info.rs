//! Admin statistics page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use shopeasy_core::stats::Stats;

use crate::error::Result;
use crate::filters;
use crate::middleware::{CspNonce, PageContext, RequireAdmin};
use crate::models::Flash;
use crate::services::flash;
use crate::state::AppState;

/// One bar in the units-sold chart.
#[derive(Clone)]
pub struct SalesBarView {
    pub title: String,
    pub sold: u64,
    /// Bar length relative to the best seller, 0-100.
    pub width: u64,
}

/// Payment method share.
#[derive(Clone)]
pub struct PaymentShareView {
    pub label: &'static str,
    pub count: u64,
    pub percent: String,
}

/// Statistics page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/info.html")]
pub struct InfoTemplate {
    pub page: PageContext,
    pub active: &'static str,
    pub total_orders: u64,
    pub shares: Vec<PaymentShareView>,
    pub bars: Vec<SalesBarView>,
}

fn sales_bars(stats: &Stats) -> Vec<SalesBarView> {
    let max = stats.max_sold();
    stats
        .top_sellers()
        .into_iter()
        .map(|sales| SalesBarView {
            title: sales.title.clone(),
            sold: sales.sold,
            width: if max == 0 { 0 } else { sales.sold * 100 / max },
        })
        .collect()
}

fn payment_shares(stats: &Stats) -> Vec<PaymentShareView> {
    let payments = stats.payments;
    vec![
        PaymentShareView {
            label: "Online",
            count: payments.online,
            percent: payments.online_percent().to_string(),
        },
        PaymentShareView {
            label: "COD",
            count: payments.cod,
            percent: payments.cod_percent().to_string(),
        },
    ]
}

/// Display payment split and units sold per product.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    RequireAdmin(auth): RequireAdmin,
) -> Result<impl IntoResponse> {
    let stats = match state.api().stats(&auth.token).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load stats");
            flash::push(&session, Flash::error(e.user_message("Failed to load stats"))).await?;
            Stats::default()
        }
    };

    let page = PageContext::for_user(&state, &session, &nonce, Some(&auth)).await?;
    Ok(InfoTemplate {
        page,
        active: "info",
        total_orders: stats.payments.total(),
        shares: payment_shares(&stats),
        bars: sales_bars(&stats),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stats(json: serde_json::Value) -> Stats {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_bars_scale_to_best_seller() {
        let stats = stats(serde_json::json!({
            "cod": 1, "online": 3,
            "data": [{"title": "Lamp", "sold": 5}, {"title": "Mug", "sold": 20}]
        }));
        let bars = sales_bars(&stats);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars.first().unwrap().title, "Mug");
        assert_eq!(bars.first().unwrap().width, 100);
        assert_eq!(bars.last().unwrap().width, 25);
    }

    #[test]
    fn test_shares_without_orders() {
        let shares = payment_shares(&Stats::default());
        assert!(shares.iter().all(|s| s.count == 0 && s.percent == "0"));
        assert!(sales_bars(&Stats::default()).is_empty());
    }
}
