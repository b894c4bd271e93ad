//! Domain events and their outbound delivery.
//!
//! Domain crates define typed events implementing [`Event`]; infrastructure wraps them
//! into a tenant-scoped [`DomainEvent`] envelope and hands it to an [`EventSink`].
//! Delivery is fire-and-forget from the engine's point of view.

pub mod envelope;
pub mod event;
pub mod in_memory_sink;
pub mod sink;

pub use envelope::DomainEvent;
pub use event::Event;
pub use in_memory_sink::{InMemoryEventSink, Subscription};
pub use sink::{EventSink, SinkError, TracingEventSink};
