//! Authentication route handlers.
//!
//! Handles login, signup and logout against the backend's `/auth` endpoints.
//! The token and user record are kept in the session by [`AuthStore`].
//!
//! [`AuthStore`]: crate::services::AuthStore

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::routes::{Layout, Shopper, safe_next};
use crate::services::{AuthError, SignupData};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

/// Signup form data.
#[derive(Debug, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub password_confirm: Option<String>,
    pub phone: Option<String>,
    pub next: Option<String>,
}

/// Where to go after logging in.
#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub email: String,
    pub next: String,
    pub error: Option<String>,
}

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub layout: Layout,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub next: String,
    pub error: Option<String>,
}

/// Re-render a form with an error.
async fn rejected<T, F>(shopper: Shopper, build: F) -> Result<Response>
where
    F: FnOnce(Layout) -> T,
    T: IntoResponse,
{
    shopper
        .page(|layout| (StatusCode::UNPROCESSABLE_ENTITY, build(layout)).into_response())
        .await
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page. Logged-in visitors go straight on.
#[instrument(skip(state, session))]
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<NextQuery>,
) -> Result<Response> {
    let shopper = Shopper::load(&state, session).await;
    let next = safe_next(query.next.as_deref()).to_owned();
    if shopper.user().is_some() {
        return shopper.redirect(&next).await;
    }
    shopper
        .page(|layout| LoginTemplate {
            layout,
            email: String::new(),
            next,
            error: None,
        })
        .await
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let mut shopper = Shopper::load(&state, session).await;
    let next = safe_next(form.next.as_deref()).to_owned();

    let result = {
        let mut auth = shopper.auth(state.api()).await;
        auth.login(&form.email, &form.password)
            .await
            .map(|user| (user.id, user.email.to_string(), user.display_name().to_owned()))
    };

    match result {
        Ok((id, email, name)) => {
            set_sentry_user(&id, Some(&email));
            shopper.toaster().success(format!("Welcome back, {name}!"));
            shopper.redirect(&next).await
        }
        Err(e) => {
            log_failure(&e, "Login failed");
            rejected(shopper, |layout| LoginTemplate {
                layout,
                email: form.email,
                next,
                error: Some(e.user_message()),
            })
            .await
        }
    }
}

// =============================================================================
// Signup Routes
// =============================================================================

/// Display the signup page.
#[instrument(skip(state, session))]
pub async fn signup_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<NextQuery>,
) -> Result<Response> {
    let shopper = Shopper::load(&state, session).await;
    let next = safe_next(query.next.as_deref()).to_owned();
    if shopper.user().is_some() {
        return shopper.redirect(&next).await;
    }
    shopper
        .page(|layout| SignupTemplate {
            layout,
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            next,
            error: None,
        })
        .await
}

/// Handle signup form submission. A new account is logged in immediately.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> Result<Response> {
    let mut shopper = Shopper::load(&state, session).await;
    let next = safe_next(form.next.as_deref()).to_owned();

    let result = if form
        .password_confirm
        .as_deref()
        .is_some_and(|confirm| confirm != form.password)
    {
        Err(AuthError::WeakPassword("Passwords do not match".to_owned()))
    } else {
        let data = SignupData {
            name: form.name.clone(),
            email: form.email.clone(),
            password: form.password.clone(),
            phone: form.phone.clone(),
        };
        let mut auth = shopper.auth(state.api()).await;
        auth.signup(data)
            .await
            .map(|user| (user.id, user.email.to_string(), user.display_name().to_owned()))
    };

    match result {
        Ok((id, email, name)) => {
            set_sentry_user(&id, Some(&email));
            shopper
                .toaster()
                .success(format!("Welcome to Verdant Organics, {name}!"));
            shopper.redirect(&next).await
        }
        Err(e) => {
            log_failure(&e, "Signup failed");
            rejected(shopper, |layout| SignupTemplate {
                layout,
                name: form.name,
                email: form.email,
                phone: form.phone.unwrap_or_default(),
                next,
                error: Some(e.user_message()),
            })
            .await
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Log out and return to the home page.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Response> {
    let mut shopper = Shopper::load(&state, session).await;
    shopper.auth(state.api()).await.logout();
    clear_sentry_user();
    shopper.toaster().info("You have been logged out");
    shopper.redirect("/").await
}

/// Transport failures are worth a warning; refusals are routine.
fn log_failure(error: &AuthError, message: &str) {
    match error {
        AuthError::Api(e) => warn!(error = %e, "{message}"),
        other => tracing::debug!(reason = %other, "{message}"),
    }
}
