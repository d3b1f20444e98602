//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::api::ProfileUpdate;
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::SessionUser;
use crate::routes::{Layout, Shopper};
use crate::state::AppState;

/// Profile form data.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl ProfileForm {
    /// The fields that differ from the current user. A blank name is left
    /// unchanged; blank phone or address clear nothing either.
    fn changes(&self, current: &SessionUser) -> ProfileUpdate {
        let changed = |value: &str, existing: Option<&str>| {
            let value = value.trim();
            (!value.is_empty() && Some(value) != existing).then(|| value.to_owned())
        };
        ProfileUpdate {
            name: changed(&self.name, Some(current.name.as_str())),
            phone: changed(&self.phone, current.phone.as_deref()),
            address: changed(&self.address, current.address.as_deref()),
        }
    }
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub layout: Layout,
    pub email: String,
    pub form: ProfileForm,
    pub error: Option<String>,
}

impl ProfileForm {
    fn from_user(user: &SessionUser) -> Self {
        Self {
            name: user.name.clone(),
            phone: user.phone.clone().unwrap_or_default(),
            address: user.address.clone().unwrap_or_default(),
        }
    }
}

/// Display the profile.
#[instrument(skip_all)]
pub async fn profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
) -> Result<Response> {
    let form = ProfileForm::from_user(&auth.user);
    let email = auth.user.email.to_string();
    Shopper::load(&state, session)
        .await
        .page(|layout| ProfileTemplate {
            layout,
            email,
            form,
            error: None,
        })
        .await
}

/// Save profile changes.
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    let mut shopper = Shopper::load(&state, session).await;
    let update = form.changes(&auth.user);
    if update.is_empty() {
        shopper.toaster().info("Nothing to update");
        return shopper.redirect("/account").await;
    }

    let result = {
        let mut store = shopper.auth(state.api()).await;
        store.update_profile(update).await.map(|_| ())
    };

    match result {
        Ok(()) => {
            shopper.toaster().success("Profile updated");
            shopper.redirect("/account").await
        }
        Err(e) => {
            warn!(error = %e, "Profile update failed");
            let email = auth.user.email.to_string();
            shopper
                .page(|layout| {
                    (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        ProfileTemplate {
                            layout,
                            email,
                            form,
                            error: Some(e.user_message()),
                        },
                    )
                        .into_response()
                })
                .await
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user() -> SessionUser {
        serde_json::from_value(serde_json::json!({
            "id": 4,
            "name": "Asha",
            "email": "asha@example.com",
            "phone": "9876543210"
        }))
        .unwrap()
    }

    #[test]
    fn test_only_changed_fields_are_sent() {
        let form = ProfileForm {
            name: "Asha".to_string(),
            phone: " 9123456780 ".to_string(),
            address: String::new(),
        };
        let update = form.changes(&user());
        assert_eq!(update.name, None);
        assert_eq!(update.phone.as_deref(), Some("9123456780"));
        assert_eq!(update.address, None);
    }

    #[test]
    fn test_unchanged_form_is_empty() {
        let update = ProfileForm::from_user(&user()).changes(&user());
        assert!(update.is_empty());
    }
}
