//! Session middleware configuration for admin.
//!
//! Admin sessions carry the logged-in admin and flash toasts between a form
//! post and the page it redirects to. They use stricter cookie settings than
//! the storefront (SameSite=Strict, 24hr expiry) and a much smaller store.

use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_moka_store::MokaStore;
use verdant_storefront::middleware::create_session_store;

use crate::config::AdminConfig;

/// Session cookie name for admin.
pub const SESSION_COOKIE_NAME: &str = "verdant_admin_session";

/// Session expiry time in seconds (24 hours - stricter than storefront).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Most admin sessions held at once.
const MAX_SESSIONS: u64 = 1_000;

/// Create the session layer.
#[must_use]
pub fn create_session_layer(config: &AdminConfig) -> SessionManagerLayer<MokaStore> {
    let is_secure = config.base_url.scheme() == "https";

    SessionManagerLayer::new(create_session_store(MAX_SESSIONS))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        // SameSite=Strict for admin (stricter than storefront's Lax)
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}
