//! Authentication store.
//!
//! Holds the logged-in user for one request. The bearer token and the user
//! record are persisted under the `token` and `user` storage keys; a cached
//! user is trusted as-is, and a token without a cached user is exchanged for
//! one via `GET /auth/me`.

mod error;

pub use error::AuthError;

use tracing::{debug, info, instrument, warn};

use verdant_core::Email;

use crate::api::{ApiClient, ApiError, AuthResponse, LoginRequest, ProfileUpdate, SignupRequest};
use crate::models::{SessionUser, keys};
use crate::storage::{LocalStorage, read_json, write_json};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Registration details as entered on the signup form.
#[derive(Debug, Clone, Default)]
pub struct SignupData {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

/// The visitor's authentication state.
pub struct AuthStore<'a> {
    api: &'a ApiClient,
    storage: &'a mut dyn LocalStorage,
    user: Option<SessionUser>,
}

impl<'a> AuthStore<'a> {
    /// Restore the authentication state from storage.
    ///
    /// A cached user that fails to decode is treated as absent. When only a
    /// token is stored, the user is fetched with it; a rejected token is
    /// discarded.
    pub async fn restore(api: &'a ApiClient, storage: &'a mut dyn LocalStorage) -> Self {
        let cached: Option<SessionUser> = read_json(storage, keys::USER);
        let mut store = Self {
            api,
            storage,
            user: cached,
        };
        if store.user.is_none()
            && let Some(token) = store.token()
        {
            store.restore_from_token(&token).await;
        }
        store
    }

    #[instrument(skip_all)]
    async fn restore_from_token(&mut self, token: &str) {
        match self.api.me(token).await {
            Ok(user) => {
                debug!(user_id = %user.id, "Restored user from token");
                write_json(&mut *self.storage, keys::USER, &user);
                self.user = Some(user);
            }
            Err(ApiError::Unauthorized(_)) => {
                info!("Discarding rejected token");
                self.storage.remove_item(keys::TOKEN);
            }
            Err(e) => warn!(error = %e, "Failed to restore user from token"),
        }
    }

    #[must_use]
    pub const fn current_user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// The stored bearer token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.storage.get_item(keys::TOKEN).filter(|t| !t.is_empty())
    }

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` before any network call if the email
    /// is malformed, and `AuthError::Rejected` if the backend refuses the
    /// credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&mut self, email: &str, password: &str) -> Result<&SessionUser, AuthError> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(AuthError::MissingField("Password"));
        }
        let response = self
            .api
            .login(&LoginRequest {
                email: email.as_str(),
                password,
            })
            .await
            .map_err(rejection)?;
        info!(user_id = %response.user.id, "User logged in");
        Ok(self.establish(response))
    }

    /// Register a new account and log it in.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any network call, or
    /// `AuthError::Rejected` if the backend refuses the registration.
    #[instrument(skip(self, data), fields(email = %data.email))]
    pub async fn signup(&mut self, data: SignupData) -> Result<&SessionUser, AuthError> {
        let name = data.name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingField("Name"));
        }
        let email = Email::parse(&data.email)?;
        validate_password(&data.password)?;

        let request = SignupRequest {
            name: name.to_owned(),
            email: email.into_inner(),
            password: data.password,
            phone: data
                .phone
                .map(|p| p.trim().to_owned())
                .filter(|p| !p.is_empty()),
        };
        let response = self.api.signup(&request).await.map_err(rejection)?;
        info!(user_id = %response.user.id, "User signed up");
        Ok(self.establish(response))
    }

    fn establish(&mut self, response: AuthResponse) -> &SessionUser {
        self.storage.set_item(keys::TOKEN, response.token);
        write_json(&mut *self.storage, keys::USER, &response.user);
        self.user.insert(response.user)
    }

    /// Forget the user and everything persisted on their behalf.
    pub fn logout(&mut self) {
        self.storage.remove_item(keys::TOKEN);
        self.storage.remove_item(keys::USER);
        self.storage.remove_item(keys::CUSTOMER_EMAIL);
        if let Some(user) = self.user.take() {
            info!(user_id = %user.id, "User logged out");
        }
    }

    /// Update profile fields on the backend and in the cached user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` without a user and token, or the
    /// backend's refusal.
    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &mut self,
        update: ProfileUpdate,
    ) -> Result<&SessionUser, AuthError> {
        let token = self.token().ok_or(AuthError::NotAuthenticated)?;
        let current = self.user.clone().ok_or(AuthError::NotAuthenticated)?;

        let returned = self
            .api
            .update_profile(&token, &update)
            .await
            .map_err(rejection)?;
        let user = returned.unwrap_or_else(|| apply_update(current, update));
        Ok(self.update_user(user))
    }

    /// Replace the cached user.
    pub fn update_user(&mut self, user: SessionUser) -> &SessionUser {
        write_json(&mut *self.storage, keys::USER, &user);
        self.user.insert(user)
    }
}

/// Map backend refusals to a message for the form; keep transport failures.
fn rejection(error: ApiError) -> AuthError {
    match error {
        ApiError::Unauthorized(message)
        | ApiError::NotFound(message)
        | ApiError::Rejected { message, .. } => AuthError::Rejected(message),
        other => AuthError::Api(other),
    }
}

fn apply_update(mut user: SessionUser, update: ProfileUpdate) -> SessionUser {
    if let Some(name) = update.name {
        user.name = name;
    }
    if update.phone.is_some() {
        user.phone = update.phone;
    }
    if update.address.is_some() {
        user.address = update.address;
    }
    user
}

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;
    use verdant_core::{UserId, UserRole};

    use super::*;
    use crate::storage::MemoryStorage;

    /// Client pointed at a closed port: any network call fails fast.
    fn offline_api() -> ApiClient {
        ApiClient::new(&Url::parse("http://127.0.0.1:9/api").unwrap())
    }

    fn user() -> SessionUser {
        SessionUser {
            id: UserId::new(3),
            name: "Asha".to_string(),
            email: Email::parse("asha@example.com").unwrap(),
            role: UserRole::Customer,
            phone: None,
            address: None,
        }
    }

    #[tokio::test]
    async fn test_cached_user_is_trusted_without_network() {
        let api = offline_api();
        let mut storage = MemoryStorage::new();
        storage.set_item(keys::TOKEN, "t".to_string());
        write_json(&mut storage, keys::USER, &user());

        let store = AuthStore::restore(&api, &mut storage).await;
        assert!(store.is_authenticated());
        assert_eq!(store.current_user().unwrap().name, "Asha");
        assert_eq!(store.token().as_deref(), Some("t"));
    }

    #[tokio::test]
    async fn test_corrupt_cached_user_is_absent() {
        let api = offline_api();
        let mut storage = MemoryStorage::new();
        storage.set_item(keys::USER, "{\"id\":".to_string());

        let store = AuthStore::restore(&api, &mut storage).await;
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_invalid_email_fails_before_network() {
        let api = offline_api();
        let mut storage = MemoryStorage::new();
        let mut store = AuthStore::restore(&api, &mut storage).await;

        let err = store.login("not-an-email", "secret123").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));

        let err = store
            .signup(SignupData {
                name: "Asha".to_string(),
                email: "asha@example.com".to_string(),
                password: "short".to_string(),
                phone: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));
    }

    #[tokio::test]
    async fn test_logout_clears_persisted_keys() {
        let api = offline_api();
        let mut storage = MemoryStorage::new();
        storage.set_item(keys::TOKEN, "t".to_string());
        storage.set_item(keys::CUSTOMER_EMAIL, "asha@example.com".to_string());
        storage.set_item(keys::CART, "[]".to_string());
        write_json(&mut storage, keys::USER, &user());

        let mut store = AuthStore::restore(&api, &mut storage).await;
        store.logout();
        assert!(!store.is_authenticated());
        drop(store);

        assert!(storage.get_item(keys::TOKEN).is_none());
        assert!(storage.get_item(keys::USER).is_none());
        assert!(storage.get_item(keys::CUSTOMER_EMAIL).is_none());
        assert_eq!(storage.get_item(keys::CART).as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_update_profile_requires_login() {
        let api = offline_api();
        let mut storage = MemoryStorage::new();
        let mut store = AuthStore::restore(&api, &mut storage).await;
        let err = store
            .update_profile(ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated));
    }

    #[test]
    fn test_apply_update_merges_present_fields() {
        let updated = apply_update(
            user(),
            ProfileUpdate {
                name: None,
                phone: Some("98765".to_string()),
                address: None,
            },
        );
        assert_eq!(updated.name, "Asha");
        assert_eq!(updated.phone.as_deref(), Some("98765"));
    }
}
