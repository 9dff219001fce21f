//! Per-page layout data.
//!
//! Every full page renders the same header (who is signed in, the cart badge)
//! and the queued flash notifications. Building a [`PageContext`] drains the
//! flash queue, so handlers that may still redirect build it after their
//! guards instead of taking it as an extractor.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use super::auth::{self, Authenticated};
use super::csp::CspNonce;
use crate::error::AppError;
use crate::models::Flash;
use crate::services::{cart, flash};
use crate::state::AppState;

/// Layout data shared by every full-page template.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub signed_in: bool,
    pub is_admin: bool,
    pub user_email: String,
    pub cart_count: u32,
    pub flashes: Vec<Flash>,
    pub nonce: String,
}

impl PageContext {
    /// Build the context, resolving the signed-in user from the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn build(
        state: &AppState,
        session: &Session,
        nonce: &CspNonce,
    ) -> Result<Self, AppError> {
        let auth = auth::resolve(session, state.api()).await?;
        Self::for_user(state, session, nonce, auth.as_ref()).await
    }

    /// Build the context for an already resolved user.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn for_user(
        state: &AppState,
        session: &Session,
        nonce: &CspNonce,
        auth: Option<&Authenticated>,
    ) -> Result<Self, AppError> {
        let mut page = Self {
            nonce: nonce.value().to_owned(),
            ..Self::default()
        };

        if let Some(auth) = auth {
            page.signed_in = true;
            page.is_admin = auth.user.is_admin();
            page.user_email = auth.user.email.to_string();
            page.cart_count = cart::summary(state.api(), session, &auth.token)
                .await?
                .total_quantity();
        }

        page.flashes = flash::take(session).await?;
        Ok(page)
    }

    /// Overwrite the badge count after the handler fetched the cart itself.
    pub const fn set_cart_count(&mut self, count: u32) {
        self.cart_count = count;
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;
        let nonce = CspNonce::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});
        Self::build(state, &session, &nonce).await
    }
}
