//! Business logic services for admin.

pub mod product_lookup;

pub use product_lookup::ProductLookup;
