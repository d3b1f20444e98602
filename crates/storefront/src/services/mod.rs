//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Login, signup and profile state backed by the session
//! - `checkout` - Checkout form validation and order submission
//! - `orders` - Joining order items with their products for display
//! - `wishlist` - The logged-in user's wishlist

pub mod auth;
pub mod checkout;
pub mod orders;
pub mod wishlist;

pub use auth::{AuthError, AuthStore, SignupData};
pub use checkout::{CheckoutError, CheckoutForm, CheckoutService, CustomerDetails};
pub use orders::{EnrichedItem, enrich_items};
pub use wishlist::{WishlistError, WishlistStore};
