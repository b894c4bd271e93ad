//! Entity trait: identity + tenant ownership across state changes.

use crate::id::TenantId;

/// A persisted, tenant-owned domain object.
///
/// Stores key every entity by `(tenant_id(), id())`; two entities with the same id in
/// different tenants are unrelated rows.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Returns the owning tenant.
    fn tenant_id(&self) -> TenantId;
}
