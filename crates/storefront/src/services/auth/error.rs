//! Authentication error types.

use thiserror::Error;

use crate::api::ApiError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] verdant_core::EmailError),

    /// A required field was left empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Wrong email or password, or the account already exists.
    #[error("{0}")]
    Rejected(String),

    /// The operation needs a logged-in user.
    #[error("not logged in")]
    NotAuthenticated,

    /// Backend request failed.
    #[error("backend error: {0}")]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Message to show on the login/signup form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address".to_owned(),
            Self::MissingField(field) => format!("{field} is required"),
            Self::WeakPassword(reason) => reason.clone(),
            Self::Rejected(message) => message.clone(),
            Self::NotAuthenticated => "Please log in to continue".to_owned(),
            Self::Api(_) => "Something went wrong. Please try again.".to_owned(),
        }
    }
}
