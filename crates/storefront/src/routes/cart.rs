//! Cart route handlers.
//!
//! Every mutation is forwarded to the backend and followed by a full refetch
//! (`services::cart::settle`), so the navigation badge always shows the
//! server-confirmed quantity once the redirect lands.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use shopeasy_core::cart::CartState;
use shopeasy_core::{CartAction, CartItem, CartItemId, ProductId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{CspNonce, OptionalAuth, PageContext, RequireAuth};
use crate::models::Flash;
use crate::services::{cart, flash};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub id: String,
    pub product_id: String,
    pub title: String,
    pub image: Option<String>,
    pub unit_price: String,
    pub quantity: u32,
    pub line_total: String,
}

impl From<&CartItem> for CartLineView {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.to_string(),
            product_id: item.product.id.to_string(),
            title: item.product.title.clone(),
            image: item.product.thumbnail().map(String::from),
            unit_price: item.product.price.to_string(),
            quantity: item.quantity,
            line_total: item.line_total().to_string(),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
    pub subtotal: String,
}

impl From<&CartState> for CartView {
    fn from(state: &CartState) -> Self {
        Self {
            lines: state.items().iter().map(CartLineView::from).collect(),
            item_count: state.total_quantity(),
            subtotal: state.sub_total().to_string(),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub return_to: Option<String>,
}

/// Quantity change form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item_id: String,
    pub action: CartAction,
}

/// Remove line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub item_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// Cart count badge fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Only same-site paths are accepted as redirect targets.
fn safe_return_to(candidate: Option<&str>, fallback: &str) -> String {
    match candidate {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.contains("://") =>
        {
            path.to_owned()
        }
        _ => fallback.to_owned(),
    }
}

/// Display cart page.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    RequireAuth(auth): RequireAuth,
) -> Result<impl IntoResponse> {
    let current = match cart::refresh(state.api(), &session, &auth.token).await {
        Ok(current) => current,
        Err(AppError::Api(e)) => {
            tracing::warn!(error = %e, "Failed to fetch cart");
            flash::push(&session, Flash::error(e.user_message("Failed to load cart"))).await?;
            cart::load(&session).await?
        }
        Err(e) => return Err(e),
    };

    let mut page = PageContext::for_user(&state, &session, &nonce, Some(&auth)).await?;
    page.set_cart_count(current.total_quantity());

    Ok(CartShowTemplate {
        page,
        cart: CartView::from(&current),
    })
}

/// Add one unit of a product.
#[instrument(skip_all, fields(product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let fallback = format!("/products/{}", urlencoding::encode(&form.product_id));
    let return_to = safe_return_to(form.return_to.as_deref(), &fallback);
    let product = ProductId::new(form.product_id);

    match state.api().add_to_cart(&auth.token, &product).await {
        Ok(response) => {
            cart::record_add(&session, response.price).await?;
            add_breadcrumb("cart", "Added product", Some(&[("product_id", product.as_str())]));
            flash::push(
                &session,
                Flash::success(response.message.unwrap_or_else(|| "Added to cart".to_string())),
            )
            .await?;
        }
        Err(e) => {
            tracing::info!(error = %e, "Add to cart rejected");
            flash::push(&session, Flash::error(e.user_message("Failed to add to cart"))).await?;
        }
    }

    cart::settle(state.api(), &session, &auth.token).await?;
    Ok(Redirect::to(&return_to).into_response())
}

/// Increment or decrement a cart line.
#[instrument(skip_all, fields(item_id = %form.item_id, action = form.action.as_str()))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let item = CartItemId::new(form.item_id);
    if let Err(e) = state.api().update_cart(&auth.token, &item, form.action).await {
        tracing::info!(error = %e, "Cart update rejected");
        flash::push(&session, Flash::error(e.user_message("Failed to update cart"))).await?;
    }

    cart::settle(state.api(), &session, &auth.token).await?;
    Ok(Redirect::to("/cart").into_response())
}

/// Remove a cart line.
#[instrument(skip_all, fields(item_id = %form.item_id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let item = CartItemId::new(form.item_id);
    let notice = match state.api().remove_from_cart(&auth.token, &item).await {
        Ok(response) => Flash::success(response.or("Removed from cart")),
        Err(e) => {
            tracing::info!(error = %e, "Cart removal rejected");
            Flash::error(e.user_message("Failed to remove item"))
        }
    };
    flash::push(&session, notice).await?;

    cart::settle(state.api(), &session, &auth.token).await?;
    Ok(Redirect::to("/cart").into_response())
}

/// Navigation badge fragment.
#[instrument(skip_all)]
pub async fn count(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(auth): OptionalAuth,
) -> Result<impl IntoResponse> {
    let count = match auth {
        Some(auth) => cart::summary(state.api(), &session, &auth.token)
            .await?
            .total_quantity(),
        None => 0,
    };
    Ok(CartCountTemplate { count })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_to_accepts_local_paths() {
        assert_eq!(safe_return_to(Some("/products?page=2"), "/cart"), "/products?page=2");
    }

    #[test]
    fn test_return_to_rejects_offsite_targets() {
        for target in ["//evil.example", "https://evil.example", "/\\evil", "products"] {
            assert_eq!(safe_return_to(Some(target), "/cart"), "/cart", "{target}");
        }
        assert_eq!(safe_return_to(None, "/cart"), "/cart");
    }
}
