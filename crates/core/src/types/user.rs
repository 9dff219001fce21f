//! Authenticated user record.

use serde::{Deserialize, Serialize};

use super::{Email, Role, UserId};

/// A user as returned by `GET /api/user/my` and the OTP verification call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub email: Email,
    #[serde(default)]
    pub role: Role,
}

impl User {
    /// Whether the user may open the admin console.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_defaults_to_user() {
        let user: User =
            serde_json::from_str(r#"{"_id":"u1","email":"a@example.com"}"#).unwrap();
        assert_eq!(user.role, Role::User);
        assert!(!user.is_admin());
    }
}
