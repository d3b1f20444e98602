//! Authenticated user as cached in durable storage.

use serde::{Deserialize, Serialize};

use verdant_core::{Email, UserId, UserRole};

/// The logged-in user.
///
/// Mirrors the `user` object returned by `/auth/login`, `/auth/signup` and
/// `/auth/me`, and is cached as JSON under the `user` storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl SessionUser {
    /// Whether the user has the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Name to greet the user with; falls back to the email's local part.
    #[must_use]
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            self.email.local_part()
        } else {
            name
        }
    }
}
