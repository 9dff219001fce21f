//! Types kept in the storefront session.

pub mod session;

pub use session::{CurrentUser, Flash, FlashKind, keys as session_keys};
