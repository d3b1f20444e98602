//! Core types for Verdant.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod email;
pub mod id;
pub mod order;
pub mod payment;
pub mod price;
pub mod product;
pub mod status;
pub mod timestamp;

pub use cart::CartLineItem;
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{Order, OrderItem};
pub use payment::payment_method_label;
pub use price::{CurrencyCode, Price};
pub use product::{Product, Variant};
pub use status::*;
pub use timestamp::parse_timestamp;
