use chrono::{DateTime, Utc};

use storecraft_core::TenantId;

/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **versioned** (schema evolution)
/// - **tenant-scoped** (every event belongs to exactly one tenant)
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "sales.order.created").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32 {
        1
    }

    /// Tenant the event belongs to.
    fn tenant_id(&self) -> TenantId;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
