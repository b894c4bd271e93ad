//! Fire-and-forget event publication.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use storecraft_events::{DomainEvent, Event, EventSink, TracingEventSink};

/// Wraps a typed event into a [`DomainEvent`] and hands it to the sink.
///
/// Publication never fails the caller: serialization and delivery errors are logged at
/// `warn` and swallowed, since the mutation they describe has already been persisted.
#[derive(Clone)]
pub struct EventPublisher {
    sink: Arc<dyn EventSink>,
}

impl EventPublisher {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Returns whether the sink accepted the event.
    pub fn publish<E>(&self, event: &E) -> bool
    where
        E: Event + Serialize,
    {
        let envelope = match DomainEvent::from_typed(event) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(
                    event_type = event.event_type(),
                    tenant_id = %event.tenant_id(),
                    error = %err,
                    "failed to serialize domain event"
                );
                return false;
            }
        };
        match self.sink.publish(envelope) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    event_type = event.event_type(),
                    tenant_id = %event.tenant_id(),
                    error = %err,
                    "failed to publish domain event"
                );
                false
            }
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(Arc::new(TracingEventSink))
    }
}

impl std::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPublisher").finish_non_exhaustive()
    }
}
