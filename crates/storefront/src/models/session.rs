//! Session-related types.
//!
//! Everything the browser session carries between requests: the backend
//! token, who it belongs to, a pending OTP login, the cart summary and
//! one-shot notifications.

use serde::{Deserialize, Serialize};

use shopeasy_core::{Email, Role, User, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Backend user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Storefront role.
    pub role: Role,
}

impl CurrentUser {
    /// Whether the user may open the admin console.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
        }
    }
}

/// Notification tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

/// A notification shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    /// A success notification.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    /// An error notification.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    /// A neutral notification.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            message: message.into(),
        }
    }

    /// CSS class for the toast.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.kind {
            FlashKind::Success => "toast toast-success",
            FlashKind::Error => "toast toast-error",
            FlashKind::Info => "toast toast-info",
        }
    }
}

/// Session keys.
pub mod keys {
    /// Backend session token.
    pub const TOKEN: &str = "token";

    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Id of the pending OTP login (see `crate::services::otp`).
    pub const OTP_FLOW: &str = "otp_flow";

    /// Cart summary (`shopeasy_core::cart::CartState`).
    pub const CART: &str = "cart";

    /// Queued notifications.
    pub const FLASH: &str = "flash";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_current_user_from_backend_user() {
        let user: User = serde_json::from_str(
            r#"{"_id":"u1","email":"admin@shop.example","role":"admin"}"#,
        )
        .unwrap();
        let current = CurrentUser::from(user);
        assert!(current.is_admin());
        assert_eq!(current.email.as_str(), "admin@shop.example");
    }

    #[test]
    fn test_flash_classes() {
        assert_eq!(Flash::success("ok").css_class(), "toast toast-success");
        assert_eq!(Flash::error("no").css_class(), "toast toast-error");
        assert_eq!(Flash::info("hi").kind, FlashKind::Info);
    }
}
