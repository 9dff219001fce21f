//! Admin console route handlers.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin):
//! guests are sent to the login page and other users to the home page.

pub mod info;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::state::AppState;

/// Upper bound for the multipart product form (several photos).
const UPLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route(
            "/products",
            post(products::create).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        .route("/products/{id}/edit", get(products::edit))
        .route("/products/{id}", post(products::update))
        .route("/orders", get(orders::index))
        .route("/orders/{id}/status", post(orders::update_status))
        .route("/info", get(info::index))
}
