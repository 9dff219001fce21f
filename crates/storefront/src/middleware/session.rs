//! Session middleware configuration.
//!
//! Sessions live in process memory. They hold the backend token, the signed-in
//! user, the cart summary, a pending OTP flow and queued notifications, all of
//! which can be rebuilt from the backend or by signing in again.

use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "shopeasy_session";

/// Session expiry after inactivity, matching the backend token lifetime (15 days).
const SESSION_EXPIRY_SECONDS: i64 = 15 * 24 * 60 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
