//! Admin session models.

use serde::{Deserialize, Serialize};

use verdant_core::{Email, UserId, UserRole};
use verdant_storefront::models::SessionUser;

/// Session keys.
pub mod session_keys {
    /// The logged-in [`super::CurrentAdmin`].
    pub const CURRENT_ADMIN: &str = "current_admin";
}

/// The account logged in to the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAdmin {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
}

impl CurrentAdmin {
    /// Whether the account may use the panel.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<SessionUser> for CurrentAdmin {
    fn from(user: SessionUser) -> Self {
        Self {
            name: user.display_name().to_owned(),
            id: user.id,
            email: user.email,
            role: user.role,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_backend_user() {
        let json = r#"{"id": 2, "email": "lata@verdant.example", "role": "admin"}"#;
        let user: SessionUser = serde_json::from_str(json).unwrap();
        let admin = CurrentAdmin::from(user);
        assert!(admin.is_admin());
        assert_eq!(admin.name, "lata");

        let json = r#"{"id": 1, "name": "Asha", "email": "asha@example.com", "role": "user"}"#;
        let user: SessionUser = serde_json::from_str(json).unwrap();
        assert!(!CurrentAdmin::from(user).is_admin());
    }
}
