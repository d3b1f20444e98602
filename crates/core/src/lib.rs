//! Verdant Core - Shared domain types.
//!
//! This crate provides the types used by every Verdant component:
//! - `storefront` - Customer-facing shop (catalog, cart, checkout, wishlist)
//! - `admin` - Internal administration panel (products, orders, reports)
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Raw backend payloads are normalized into these types at the edge
//! (see `verdant_storefront::catalog`), so everything downstream only ever
//! sees the canonical shapes defined here.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, emails, money, products, cart lines, orders,
//!   statuses and payment-method labels

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
