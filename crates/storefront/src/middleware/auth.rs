//! Authentication extractors.
//!
//! The logged-in user is the cached `user` record in the session; the bearer
//! token sits next to it under `token`.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{SessionUser, keys};

/// A logged-in user together with their bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: SessionUser,
    pub token: String,
}

/// Extractor that requires a logged-in user.
///
/// If the user is not logged in, returns a redirect to the login page.
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(auth): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", auth.user.display_name())
/// }
/// ```
pub struct RequireAuth(pub AuthenticatedUser);

/// Error returned when authentication is required but the user is not logged in.
pub enum AuthRejection {
    /// Redirect to login page (for page requests).
    RedirectToLogin(String),
    /// Unauthorized response (for HTMX requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(next) => Redirect::to(&format!(
                "/auth/login?next={}",
                urlencoding::encode(&next)
            ))
            .into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let rejection = || {
            if parts.headers.contains_key("hx-request") {
                AuthRejection::Unauthorized
            } else {
                // Nested routers see a stripped URI
                let path = parts
                    .extensions
                    .get::<OriginalUri>()
                    .map_or_else(|| parts.uri.path(), |uri| uri.path());
                AuthRejection::RedirectToLogin(path.to_owned())
            }
        };

        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        let user = load_user(session).await.ok_or_else(rejection)?;
        let token = session
            .get::<String>(keys::TOKEN)
            .await
            .ok()
            .flatten()
            .filter(|t| !t.is_empty())
            .ok_or_else(rejection)?;

        Ok(Self(AuthenticatedUser { user, token }))
    }
}

/// Extractor that requires a logged-in user with the admin role.
///
/// Anyone not logged in is handled as by [`RequireAuth`]; other users get 403.
pub struct RequireAdmin(pub AuthenticatedUser);

/// Error returned when an admin is required.
pub enum AdminRejection {
    /// Not logged in.
    Auth(AuthRejection),
    /// Logged in without the admin role.
    Forbidden,
}

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Auth(rejection) => rejection.into_response(),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Admin access required").into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AdminRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(auth) = RequireAuth::from_request_parts(parts, state)
            .await
            .map_err(AdminRejection::Auth)?;
        if !auth.user.is_admin() {
            return Err(AdminRejection::Forbidden);
        }
        Ok(Self(auth))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if the user is not logged in.
pub struct OptionalAuth(pub Option<SessionUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => load_user(session).await,
            None => None,
        };

        Ok(Self(user))
    }
}

/// The cached user, decoded from its stored JSON. Anything unreadable is absent.
async fn load_user(session: &Session) -> Option<SessionUser> {
    let raw: String = session.get(keys::USER).await.ok().flatten()?;
    serde_json::from_str(&raw).ok()
}
