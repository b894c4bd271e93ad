//! `storecraft-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! tenant-scoped identifiers, money, and the error taxonomy shared by every layer.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    CategoryId, CollectionId, DiscountId, OrderId, ProductId, SectionId, TenantId, VariantId,
};
pub use money::Money;
