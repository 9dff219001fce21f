//! Request and response bodies of the backend endpoints.
//!
//! Entity records live in `shopeasy_core`; these are the envelopes around
//! them.

use serde::{Deserialize, Serialize};
use shopeasy_core::otp::OtpCode;
use shopeasy_core::{
    Email, Order, OrderStatus, PaymentMethod, Price, Product, ProductId, User,
};

/// The common `{message}` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

impl MessageResponse {
    /// The backend's message, or `fallback` when it sent none.
    #[must_use]
    pub fn or(self, fallback: &str) -> String {
        self.message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Error body shape.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a Email,
}

#[derive(Debug, Serialize)]
pub(crate) struct VerifyRequest<'a> {
    pub email: &'a Email,
    pub otp: &'a OtpCode,
}

/// Successful OTP verification.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub(crate) struct AddToCartRequest<'a> {
    pub product: &'a ProductId,
}

/// Acknowledgement of `POST /api/cart/add`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddToCartResponse {
    #[serde(default)]
    pub message: Option<String>,
    /// Unit price of the added product, when the backend reports it.
    #[serde(default)]
    pub price: Option<Price>,
}

#[derive(Debug, Serialize)]
pub(crate) struct IdRequest<'a> {
    pub id: &'a str,
}

/// One page of `GET /api/product/all`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPage {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(rename = "totalPages", default)]
    pub total_pages: u32,
    /// Latest arrivals, shown on the home page.
    #[serde(rename = "newProduct", default)]
    pub new_products: Vec<Product>,
}

/// `GET /api/product/:id`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDetail {
    pub product: Product,
    #[serde(rename = "relatedProduct", default)]
    pub related: Vec<Product>,
}

/// `GET /api/order/all`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct OrderList {
    #[serde(default)]
    pub orders: Vec<Order>,
}

/// Body of both order placement endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub method: PaymentMethod,
    pub phone: String,
    pub address: String,
}

/// `POST /api/order/new/online`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct VerifyPaymentRequest<'a> {
    pub session_id: &'a str,
}

/// `POST /api/order/verify/payment`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentVerification {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusRequest {
    pub status: OrderStatus,
}
