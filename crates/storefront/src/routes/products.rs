//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use shopeasy_core::listing::{ListingQuery, PriceSort};
use shopeasy_core::{Product, ProductId};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{CspNonce, OptionalAuth, PageContext};
use crate::state::AppState;

/// Descriptions on cards are cut to this many characters.
const CARD_DESCRIPTION_CHARS: usize = 80;

/// Product card data for grids (home, listing, related, admin).
#[derive(Clone)]
pub struct ProductCardView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: String,
    pub image: Option<String>,
    pub in_stock: bool,
    pub is_new: bool,
}

impl ProductCardView {
    /// Card for a product; `is_new` adds the "New" badge.
    #[must_use]
    pub fn new(product: &Product, is_new: bool) -> Self {
        let title = if product.title.is_empty() {
            "No Title".to_string()
        } else {
            product.title.clone()
        };
        let description = if product.description.is_empty() {
            "No Description".to_string()
        } else {
            truncate(&product.description, CARD_DESCRIPTION_CHARS)
        };

        Self {
            id: product.id.to_string(),
            title,
            description,
            price: product.price.to_string(),
            image: product.thumbnail().map(String::from),
            in_stock: product.in_stock(),
            is_new,
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let mut short: String = text.chars().take(max).collect();
    short.push('…');
    short
}

/// Category option in the listing filter.
#[derive(Clone)]
pub struct CategoryOption {
    pub name: String,
    pub selected: bool,
}

/// Sort option in the listing filter.
#[derive(Clone)]
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub products: Vec<ProductCardView>,
    pub categories: Vec<CategoryOption>,
    pub sorts: Vec<SortOption>,
    pub search: String,
    pub has_filters: bool,
    pub current_page: u32,
    pub total_pages: u32,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: String,
    pub images: Vec<String>,
    pub stock: i64,
    pub in_stock: bool,
    pub related: Vec<ProductCardView>,
}

fn listing_url(query: &ListingQuery) -> String {
    format!("/products{}", query.to_query_string())
}

/// Display the filtered, paginated product listing.
#[instrument(skip(state, session, nonce))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Query(query): Query<ListingQuery>,
) -> Result<Response> {
    let listing = state.api().products(&query).await?;

    // Past the last page (stale link or filters narrowed): go to the last one
    let total_pages = listing.total_pages.max(1);
    if query.page() > total_pages {
        let clamped = query.clone().with_page(query.page(), total_pages);
        return Ok(Redirect::to(&listing_url(&clamped)).into_response());
    }

    let categories = listing
        .categories
        .iter()
        .map(|name| CategoryOption {
            name: name.clone(),
            selected: name == query.category(),
        })
        .collect();
    let sorts = PriceSort::ALL
        .into_iter()
        .map(|sort| SortOption {
            value: sort.as_str(),
            label: sort.label(),
            selected: query.sort() == Some(sort),
        })
        .collect();

    let current_page = query.page();
    let prev_url = (current_page > 1).then(|| listing_url(&query.prev_page()));
    let next_url = (current_page < total_pages).then(|| listing_url(&query.next_page(total_pages)));

    let page = PageContext::build(&state, &session, &nonce).await?;
    Ok(ProductsIndexTemplate {
        page,
        products: listing
            .products
            .iter()
            .map(|p| ProductCardView::new(p, false))
            .collect(),
        categories,
        sorts,
        search: query.search().to_owned(),
        has_filters: query.has_filters(),
        current_page,
        total_pages,
        prev_url,
        next_url,
    }
    .into_response())
}

/// Display product detail page with related products.
#[instrument(skip(state, session, nonce, auth))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    OptionalAuth(auth): OptionalAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let detail = match state.api().product(&ProductId::new(id)).await {
        Ok(detail) => detail,
        Err(e) if e.is_not_found() || e.is_client_error() => {
            return Err(AppError::NotFound("product".to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    let product = detail.product;

    let page = PageContext::for_user(&state, &session, &nonce, auth.as_ref()).await?;
    Ok(ProductShowTemplate {
        page,
        id: product.id.to_string(),
        title: product.title.clone(),
        description: product.description.clone(),
        category: product.category.clone(),
        price: product.price.to_string(),
        images: product.images.iter().map(|image| image.url.clone()).collect(),
        stock: product.stock,
        in_stock: product.in_stock(),
        related: detail
            .related
            .iter()
            .map(|p| ProductCardView::new(p, false))
            .collect(),
    }
    .into_response())
}
