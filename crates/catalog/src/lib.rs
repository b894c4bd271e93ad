//! Catalog domain module: products, categories, collections and price rules.
//!
//! Pure domain logic (no IO, no storage).

pub mod pricing;
pub mod product;
pub mod slug;
pub mod taxonomy;

pub use pricing::{BulkAdjustment, MAX_PRICE, validate_price, validate_price_pair};
pub use product::{MediaRef, Product, ProductEvent, ProductStatus, ProductStatusChanged};
pub use slug::slugify;
pub use taxonomy::{Category, Collection};
