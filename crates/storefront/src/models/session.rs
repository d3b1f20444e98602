//! Session keys.
//!
//! The visitor's session is the storefront's durable storage: the persisted
//! keys below hold exactly what a browser would keep in local storage, and
//! are read and written through [`crate::storage::SessionStorage`].

/// Session keys.
pub mod keys {
    /// Bearer token of the logged-in user.
    pub const TOKEN: &str = "token";

    /// JSON-encoded [`crate::models::SessionUser`].
    pub const USER: &str = "user";

    /// Email used for the most recent order, for guest order lookup.
    pub const CUSTOMER_EMAIL: &str = "customer_email";

    /// JSON array of cart line items.
    pub const CART: &str = "cart";

    /// Notification carried across a redirect.
    pub const FLASH: &str = "flash";

    /// Keys that make up the visitor's durable storage.
    pub const PERSISTED: [&str; 4] = [TOKEN, USER, CUSTOMER_EMAIL, CART];
}
