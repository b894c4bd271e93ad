//! Outbound event delivery abstraction.
//!
//! An `EventSink` is the engine's only view of the event bus. Delivery is
//! **fire-and-forget**: a publish failure is reported to the caller, which logs it and
//! carries on; it never turns a successful mutation into a failed action.

use std::sync::Arc;

use thiserror::Error;

use crate::envelope::DomainEvent;

#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink's internal state is unusable (e.g. a poisoned lock).
    #[error("event sink unavailable: {0}")]
    Unavailable(String),

    /// The transport rejected the event.
    #[error("event delivery failed: {0}")]
    Delivery(String),
}

/// Transport-agnostic event sink.
///
/// Implementations must be safe to share across threads and must not block for long;
/// a slow transport should buffer internally.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: DomainEvent) -> Result<(), SinkError>;
}

impl<S> EventSink for Arc<S>
where
    S: EventSink + ?Sized,
{
    fn publish(&self, event: DomainEvent) -> Result<(), SinkError> {
        (**self).publish(event)
    }
}

/// Sink that only writes events to the tracing log.
///
/// Used when no external bus is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: DomainEvent) -> Result<(), SinkError> {
        tracing::info!(
            event_type = event.event_type(),
            tenant_id = %event.tenant_id(),
            event_id = %event.event_id(),
            payload = %event.payload(),
            "domain event"
        );
        Ok(())
    }
}
