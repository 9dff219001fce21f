//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first, see `crate::app`)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with a `request_id` field)
//! 3. Request ID (reuse or generate `x-request-id`)
//! 4. CSP nonce (per-request nonce for inline scripts)
//! 5. Security headers (CSP built from the nonce)
//! 6. Session layer (tower-sessions, in-memory store)
//! 7. Rate limiting on the OTP routes only (governor)

pub mod auth;
pub mod csp;
pub mod page;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{Authenticated, OptionalAuth, RequireAdmin, RequireAuth, clear_login, set_login};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use page::PageContext;
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
