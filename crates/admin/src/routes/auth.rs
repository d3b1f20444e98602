//! Authentication route handlers for admin.
//!
//! Admins log in with their backend account. Only accounts whose backend
//! role is admin get a session; everyone else is turned away with 403.

use askama::Template;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{error, info, instrument, warn};

use verdant_core::Email;
use verdant_storefront::api::{ApiError, LoginRequest};
use verdant_storefront::filters;
use verdant_storefront::notify::Toast;
use verdant_storefront::routes::safe_next_or;

use crate::error::Result;
use crate::middleware::{OptionalAdminAuth, clear_current_admin, set_current_admin};
use crate::models::CurrentAdmin;
use crate::routes::{Layout, redirect_with, render};
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

/// Where to go after logging in.
#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Login page template.
#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub email: String,
    pub next: String,
    pub error: Option<String>,
}

/// Why a login attempt was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginFailure {
    Invalid(&'static str),
    NotAdmin,
    Unavailable,
}

impl LoginFailure {
    const fn status(self) -> StatusCode {
        match self {
            Self::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotAdmin => StatusCode::FORBIDDEN,
            Self::Unavailable => StatusCode::BAD_GATEWAY,
        }
    }

    const fn message(self) -> &'static str {
        match self {
            Self::Invalid(message) => message,
            Self::NotAdmin => "This account does not have admin access",
            Self::Unavailable => "Could not reach the backend. Please try again.",
        }
    }
}

fn landing(next: Option<&str>) -> String {
    safe_next_or(next, "/").to_owned()
}

/// Display the login page. A logged-in admin goes straight on.
#[instrument(skip_all)]
pub async fn login_page(
    session: Session,
    OptionalAdminAuth(admin): OptionalAdminAuth,
    Query(query): Query<NextQuery>,
) -> Result<Response> {
    let next = landing(query.next.as_deref());
    if admin.as_ref().is_some_and(CurrentAdmin::is_admin) {
        return Ok(Redirect::to(&next).into_response());
    }
    let layout = Layout::load(&session, "/auth/login").await;
    Ok(render(&LoginTemplate {
        layout,
        email: String::new(),
        next,
        error: None,
    })?
    .into_response())
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = landing(form.next.as_deref());

    match authenticate(&state, &form.email, &form.password).await {
        Ok(admin) => {
            // New session id for the new privilege level
            session.cycle_id().await?;
            set_current_admin(&session, &admin).await?;
            info!(admin_id = %admin.id, "Admin logged in");
            let toast = Toast::success(format!("Welcome back, {}", admin.name));
            Ok(redirect_with(&session, toast, &next).await.into_response())
        }
        Err(failure) => {
            let layout = Layout::load(&session, "/auth/login").await;
            let page = render(&LoginTemplate {
                layout,
                email: form.email,
                next,
                error: Some(failure.message().to_owned()),
            })?;
            Ok((failure.status(), page).into_response())
        }
    }
}

/// Check the credentials with the backend and insist on the admin role.
async fn authenticate(
    state: &AppState,
    email: &str,
    password: &str,
) -> std::result::Result<CurrentAdmin, LoginFailure> {
    let email = Email::parse(email)
        .map_err(|_| LoginFailure::Invalid("Please enter a valid email address"))?;
    if password.is_empty() {
        return Err(LoginFailure::Invalid("Password is required"));
    }

    let response = state
        .api()
        .login(&LoginRequest {
            email: email.as_str(),
            password,
        })
        .await
        .map_err(|e| match e {
            ApiError::Unauthorized(_) | ApiError::NotFound(_) | ApiError::Rejected { .. } => {
                warn!(error = %e, "Admin login rejected");
                LoginFailure::Invalid("Invalid email or password")
            }
            e => {
                error!(error = %e, "Admin login request failed");
                LoginFailure::Unavailable
            }
        })?;

    let admin = CurrentAdmin::from(response.user);
    if !admin.is_admin() {
        warn!(user_id = %admin.id, "Admin login refused for non-admin account");
        return Err(LoginFailure::NotAdmin);
    }
    Ok(admin)
}

/// Logout and clear the admin from the session.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_admin(&session).await?;
    Ok(redirect_with(&session, Toast::info("Logged out"), "/auth/login").await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_statuses() {
        assert_eq!(
            LoginFailure::Invalid("x").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(LoginFailure::NotAdmin.status(), StatusCode::FORBIDDEN);
        assert_eq!(LoginFailure::Unavailable.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_landing_stays_on_site() {
        assert_eq!(landing(Some("/orders/100")), "/orders/100");
        assert_eq!(landing(Some("https://evil.example")), "/");
        assert_eq!(landing(None), "/");
    }
}
