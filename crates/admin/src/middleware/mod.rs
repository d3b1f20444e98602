//! HTTP middleware stack for admin.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (shared with the storefront)
//! 4. Session layer (bounded moka store: logged-in admin and flash toasts)
//! 5. Security headers (shared with the storefront)
//! 6. Admin auth on every page route; login is rate limited

pub mod auth;
pub mod session;

pub use auth::{
    OptionalAdminAuth, RequireAdminAuth, clear_current_admin, current_admin, set_current_admin,
};
pub use session::create_session_layer;
pub use verdant_storefront::middleware::{
    auth_rate_limiter, request_id_middleware, security_headers_middleware,
};
