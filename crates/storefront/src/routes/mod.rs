//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (latest arrivals)
//!
//! # Products
//! GET  /products               - Listing (search, category, sort, page)
//! GET  /products/{id}          - Product detail with related products
//!
//! # Auth (email OTP)
//! GET  /login                  - Login page
//! POST /login                  - Request a code (rate limited)
//! GET  /verify                 - Six-box code entry
//! POST /verify                 - Submit the code (rate limited)
//! POST /verify/input           - Apply one keystroke (JSON)
//! POST /verify/resend          - Request a new code (rate limited)
//! POST /logout                 - Logout
//!
//! # Cart (requires auth)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add one unit
//! POST /cart/update            - Increment or decrement a line
//! POST /cart/remove            - Remove a line
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout (requires auth)
//! GET  /checkout                     - Saved addresses
//! POST /checkout/addresses           - Add an address
//! POST /checkout/addresses/{id}/delete - Delete an address
//! GET  /payment/{address_id}         - Order summary and method choice
//! POST /payment/{address_id}         - Place the order
//! GET  /ordersuccess                 - Hosted payment return
//!
//! # Orders (requires auth)
//! GET  /orders                 - Order history
//! GET  /orders/{id}            - Order detail
//!
//! # Admin (requires admin role)
//! see `admin::admin_routes`
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
///
/// The code-sending and code-checking POSTs get the per-IP limiter when
/// `rate_limit` is set.
pub fn auth_routes(rate_limit: bool) -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/verify", post(auth::verify))
        .route("/verify/resend", post(auth::resend));
    let limited = if rate_limit {
        limited.route_layer(auth_rate_limiter())
    } else {
        limited
    };

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/verify", get(auth::verify_page))
        .route("/verify/input", post(auth::otp_input))
        .route("/logout", post(auth::logout))
        .merge(limited)
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", get(checkout::index))
        .route("/checkout/addresses", post(checkout::add_address))
        .route(
            "/checkout/addresses/{id}/delete",
            post(checkout::delete_address),
        )
        .route(
            "/payment/{address_id}",
            get(checkout::payment_page).post(checkout::pay),
        )
        .route("/ordersuccess", get(checkout::order_success))
}

/// Create the order history routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
}

/// Create all routes for the storefront.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Product routes
        .nest("/products", product_routes())
        // Cart routes
        .nest("/cart", cart_routes())
        // Checkout and payment
        .merge(checkout_routes())
        // Order history
        .nest("/orders", order_routes())
        // Auth routes
        .merge(auth_routes(rate_limit))
        // Admin console
        .nest("/admin", admin::admin_routes())
}
