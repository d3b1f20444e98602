//! Session-held models for the storefront.

pub mod session;
pub mod user;

pub use session::keys;
pub use user::SessionUser;
