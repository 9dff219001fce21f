//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use shopeasy_core::listing::ListingQuery;
use tower_sessions::Session;
use tracing::instrument;

use super::products::ProductCardView;
use crate::error::Result;
use crate::filters;
use crate::middleware::{CspNonce, PageContext};
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub latest: Vec<ProductCardView>,
}

/// Display the home page with the latest products.
///
/// A failing backend leaves the grid empty rather than failing the page.
#[instrument(skip(state, session, nonce))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
) -> Result<impl IntoResponse> {
    let latest = match state.api().products(&ListingQuery::new()).await {
        Ok(listing) => listing
            .new_products
            .iter()
            .map(|p| ProductCardView::new(p, true))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load latest products");
            Vec::new()
        }
    };

    let page = PageContext::build(&state, &session, &nonce).await?;
    Ok(HomeTemplate { page, latest })
}
