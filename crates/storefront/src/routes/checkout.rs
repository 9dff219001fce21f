//! Checkout route handlers: address book, payment and online payment return.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use shopeasy_core::{Address, AddressId, NewAddress, PaymentMethod};

use super::cart::CartView;
use crate::api::OrderRequest;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{CspNonce, PageContext, RequireAuth};
use crate::models::Flash;
use crate::services::{cart, flash};
use crate::state::AppState;

/// Saved address display data.
#[derive(Clone)]
pub struct AddressView {
    pub id: String,
    pub address: String,
    pub phone: String,
}

impl From<&Address> for AddressView {
    fn from(address: &Address) -> Self {
        Self {
            id: address.id.to_string(),
            address: address.address.clone(),
            phone: address.phone.clone(),
        }
    }
}

/// Payment method option.
#[derive(Clone)]
pub struct MethodOption {
    pub value: String,
    pub label: &'static str,
}

/// New address form data.
#[derive(Debug, Deserialize)]
pub struct AddressForm {
    pub address: String,
    pub phone: String,
}

/// Payment form data.
#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    #[serde(default)]
    pub method: String,
}

/// Online payment return query.
#[derive(Debug, Deserialize)]
pub struct PaymentReturnQuery {
    pub session_id: Option<String>,
}

/// Address selection page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/addresses.html")]
pub struct CheckoutTemplate {
    pub page: PageContext,
    pub addresses: Vec<AddressView>,
}

/// Payment page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub page: PageContext,
    pub address: AddressView,
    pub cart: CartView,
    pub methods: Vec<MethodOption>,
}

/// Online payment result template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/order_success.html")]
pub struct OrderSuccessTemplate {
    pub page: PageContext,
    pub success: bool,
}

fn payment_url(address_id: &str) -> String {
    format!("/payment/{}", urlencoding::encode(address_id))
}

// =============================================================================
// Addresses
// =============================================================================

/// Display saved addresses with the add-address form.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    RequireAuth(auth): RequireAuth,
) -> Result<impl IntoResponse> {
    let addresses = match state.api().addresses(&auth.token).await {
        Ok(addresses) => addresses.iter().map(AddressView::from).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load addresses");
            flash::push(&session, Flash::error(e.user_message("Failed to load addresses"))).await?;
            Vec::new()
        }
    };

    let page = PageContext::for_user(&state, &session, &nonce, Some(&auth)).await?;
    Ok(CheckoutTemplate { page, addresses })
}

/// Validate and save a new address.
#[instrument(skip_all)]
pub async fn add_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<AddressForm>,
) -> Result<Response> {
    let Ok(address) = NewAddress::parse(&form.address, &form.phone) else {
        let notice = Flash::error("Please enter valid address & 10-digit phone number");
        return Ok(flash::redirect(&session, notice, "/checkout").await?);
    };

    let notice = match state.api().add_address(&auth.token, &address).await {
        Ok(response) => Flash::success(response.or("Address added successfully")),
        Err(e) => Flash::error(e.user_message("Failed to add address")),
    };
    Ok(flash::redirect(&session, notice, "/checkout").await?)
}

/// Delete a saved address.
#[instrument(skip_all, fields(address_id = %id))]
pub async fn delete_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let notice = match state.api().delete_address(&auth.token, &AddressId::new(id)).await {
        Ok(response) => Flash::success(response.or("Address deleted")),
        Err(e) => Flash::error(e.user_message("Failed to delete address")),
    };
    Ok(flash::redirect(&session, notice, "/checkout").await?)
}

// =============================================================================
// Payment
// =============================================================================

/// Display order summary, delivery address and payment method choice.
#[instrument(skip_all, fields(address_id = %address_id))]
pub async fn payment_page(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    RequireAuth(auth): RequireAuth,
    Path(address_id): Path<String>,
) -> Result<Response> {
    let address = match state.api().address(&auth.token, &AddressId::new(address_id)).await {
        Ok(address) => address,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load address");
            let notice = Flash::error("Failed to load address");
            return Ok(flash::redirect(&session, notice, "/checkout").await?);
        }
    };

    let current = cart::refresh(state.api(), &session, &auth.token).await?;
    if current.is_empty() {
        return Ok(flash::redirect(&session, Flash::info("Your cart is empty"), "/cart").await?);
    }

    let mut page = PageContext::for_user(&state, &session, &nonce, Some(&auth)).await?;
    page.set_cart_count(current.total_quantity());

    Ok(PaymentTemplate {
        page,
        address: AddressView::from(&address),
        cart: CartView::from(&current),
        methods: [PaymentMethod::Cod, PaymentMethod::Online]
            .into_iter()
            .map(|method| MethodOption {
                value: method.to_string(),
                label: method.label(),
            })
            .collect(),
    }
    .into_response())
}

/// Place the order: cash on delivery, or hand off to the hosted payment page.
#[instrument(skip_all, fields(address_id = %address_id, method = %form.method))]
pub async fn pay(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(address_id): Path<String>,
    Form(form): Form<PaymentForm>,
) -> Result<Response> {
    let back = payment_url(&address_id);
    let Ok(method) = form.method.parse::<PaymentMethod>() else {
        let notice = Flash::error("Please select a payment method");
        return Ok(flash::redirect(&session, notice, &back).await?);
    };

    // The order carries the stored address, never form input
    let address = match state.api().address(&auth.token, &AddressId::new(address_id)).await {
        Ok(address) => address,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load address");
            let notice = Flash::error("Failed to load address");
            return Ok(flash::redirect(&session, notice, "/checkout").await?);
        }
    };
    let order = OrderRequest {
        method,
        phone: address.phone,
        address: address.address,
    };

    match method {
        PaymentMethod::Cod => match state.api().place_cod_order(&auth.token, &order).await {
            Ok(response) => {
                tracing::info!(user_id = %auth.user.id, "COD order placed");
                add_breadcrumb("order", "Placed COD order", None);
                cart::settle(state.api(), &session, &auth.token).await?;
                let notice = Flash::success(response.or("Order placed successfully"));
                Ok(flash::redirect(&session, notice, "/orders").await?)
            }
            Err(e) => {
                tracing::warn!(error = %e, "COD order rejected");
                let notice = Flash::error(e.user_message("Failed to place order"));
                Ok(flash::redirect(&session, notice, &back).await?)
            }
        },
        PaymentMethod::Online => match state.api().start_online_payment(&auth.token, &order).await {
            Ok(checkout) => match checkout.url {
                Some(url) => {
                    tracing::info!(user_id = %auth.user.id, "Redirecting to hosted payment");
                    Ok(Redirect::to(&url).into_response())
                }
                None => {
                    let notice = Flash::error("Failed to start payment");
                    Ok(flash::redirect(&session, notice, &back).await?)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Online payment could not start");
                let notice = Flash::error("Payment failed. Try again");
                Ok(flash::redirect(&session, notice, &back).await?)
            }
        },
    }
}

/// Return from the hosted payment page: verify the session and show the result.
#[instrument(skip_all)]
pub async fn order_success(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    RequireAuth(auth): RequireAuth,
    Query(query): Query<PaymentReturnQuery>,
) -> Result<Response> {
    let Some(session_id) = query.session_id.filter(|id| !id.trim().is_empty()) else {
        let notice = Flash::error("Payment session missing");
        return Ok(flash::redirect(&session, notice, "/cart").await?);
    };

    let success = match state.api().verify_payment(&auth.token, &session_id).await {
        Ok(verification) => verification.success,
        Err(e) => {
            tracing::warn!(error = %e, "Payment verification failed");
            false
        }
    };

    if success {
        tracing::info!(user_id = %auth.user.id, "Online payment verified");
        add_breadcrumb("order", "Verified online payment", None);
        cart::settle(state.api(), &session, &auth.token).await?;
        flash::push(&session, Flash::success("Order placed successfully")).await?;
    }

    let page = PageContext::for_user(&state, &session, &nonce, Some(&auth)).await?;
    Ok(OrderSuccessTemplate { page, success }.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_url_encodes_id() {
        assert_eq!(payment_url("a1"), "/payment/a1");
        assert_eq!(payment_url("a/1"), "/payment/a%2F1");
    }
}
