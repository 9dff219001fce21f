//! Client for the ShopEasy commerce backend.
//!
//! # Architecture
//!
//! - Plain JSON over HTTP with `reqwest`; the backend owns every business rule
//! - The caller's session token travels in a `token` header
//! - Catalogue reads are cached in-process via `moka` and invalidated when an
//!   admin creates or edits a product
//!
//! # Example
//!
//! ```rust,ignore
//! use shopeasy_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config.api, config.cache_ttl)?;
//!
//! let page = client.products(&ListingQuery::new()).await?;
//! let cart = client.cart(&token).await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::{ApiClient, ImageUpload};
pub use types::*;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status {
        status: StatusCode,
        /// `message` from the error body, if there was one.
        message: Option<String>,
    },

    /// The body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The backend asked us to slow down.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// An endpoint URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Message to show the user: the backend's own `message` when it sent
    /// one, otherwise `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            Self::RateLimited(_) => "Too many requests, please slow down".to_string(),
            _ => fallback.to_string(),
        }
    }

    /// Whether the backend rejected the token.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Status { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }

    /// Whether the backend reported the resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    /// Whether this is a client-side problem the user can fix (4xx other
    /// than auth), as opposed to an outage.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Status { status, .. } if status.is_client_error())
    }
}
