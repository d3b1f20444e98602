//! Authentication extractors for admin.
//!
//! The logged-in admin is kept in the session under
//! [`session_keys::CURRENT_ADMIN`]; it is only ever written by a login whose
//! backend account has the admin role.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{Method, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentAdmin, session_keys};

/// Extractor that requires a logged-in admin.
///
/// Anonymous requests are redirected to the login page; a session holding a
/// non-admin account gets 403.
///
/// ```rust,ignore
/// async fn protected_handler(RequireAdminAuth(admin): RequireAdminAuth) -> impl IntoResponse {
///     format!("Hello, {}!", admin.name)
/// }
/// ```
pub struct RequireAdminAuth(pub CurrentAdmin);

/// Error returned when admin authentication is required.
#[derive(Debug)]
pub enum AdminAuthRejection {
    /// Redirect to the login page, coming back to the given path after.
    RedirectToLogin(Option<String>),
    /// No session layer on this route.
    Unauthorized,
    /// Logged in, but not as an admin.
    Forbidden,
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(Some(next)) => Redirect::to(&format!(
                "/auth/login?next={}",
                urlencoding::encode(&next)
            ))
            .into_response(),
            Self::RedirectToLogin(None) => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Admin access required").into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAdminAuth
where
    S: Send + Sync,
{
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AdminAuthRejection::Unauthorized)?;

        let Some(admin) = current_admin(session).await else {
            // Form posts can't be replayed after login; only pages come back.
            let next = (parts.method == Method::GET).then(|| {
                let uri = parts
                    .extensions
                    .get::<OriginalUri>()
                    .map_or(&parts.uri, |original| &original.0);
                uri.path_and_query()
                    .map_or_else(|| uri.path().to_owned(), ToString::to_string)
            });
            return Err(AdminAuthRejection::RedirectToLogin(next));
        };

        if !admin.is_admin() {
            return Err(AdminAuthRejection::Forbidden);
        }

        Ok(Self(admin))
    }
}

/// Extractor that optionally gets the current admin.
///
/// Unlike `RequireAdminAuth`, this does not reject the request if nobody is logged in.
pub struct OptionalAdminAuth(pub Option<CurrentAdmin>);

impl<S> FromRequestParts<S> for OptionalAdminAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = match parts.extensions.get::<Session>() {
            Some(session) => current_admin(session).await,
            None => None,
        };

        Ok(Self(admin))
    }
}

/// The admin stored in the session. Anything unreadable is absent.
pub async fn current_admin(session: &Session) -> Option<CurrentAdmin> {
    session
        .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await
        .ok()
        .flatten()
}

/// Helper to set the current admin in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// Helper to clear the current admin from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Request, header};
    use verdant_core::{Email, UserId, UserRole};
    use verdant_storefront::middleware::create_session_store;

    use super::*;

    fn account(role: UserRole) -> CurrentAdmin {
        CurrentAdmin {
            id: UserId::new(2),
            name: "Lata".to_string(),
            email: Email::parse("lata@verdant.example").unwrap(),
            role,
        }
    }

    async fn extract(method: Method, uri: &str, admin: Option<CurrentAdmin>) -> Response {
        let session = Session::new(None, Arc::new(create_session_store(4)), None);
        if let Some(admin) = admin {
            set_current_admin(&session, &admin).await.unwrap();
        }
        let (mut parts, ()) = Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts();
        parts.extensions.insert(session);

        match RequireAdminAuth::from_request_parts(&mut parts, &()).await {
            Ok(RequireAdminAuth(admin)) => admin.name.into_response(),
            Err(rejection) => rejection.into_response(),
        }
    }

    #[tokio::test]
    async fn test_anonymous_page_redirects_back_after_login() {
        let response = extract(Method::GET, "/orders?status=pending", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/auth/login?next=%2Forders%3Fstatus%3Dpending"
        );
    }

    #[tokio::test]
    async fn test_anonymous_post_redirects_to_plain_login() {
        let response = extract(Method::POST, "/products/2/delete", None).await;
        assert_eq!(response.headers()[header::LOCATION], "/auth/login");
    }

    #[tokio::test]
    async fn test_customer_session_is_forbidden() {
        let response = extract(Method::GET, "/", Some(account(UserRole::Customer))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_session_passes() {
        let response = extract(Method::GET, "/", Some(account(UserRole::Admin))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
