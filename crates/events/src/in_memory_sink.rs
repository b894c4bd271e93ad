//! In-memory event sink for tests/dev.

use std::sync::{Mutex, mpsc};
use std::time::Duration;

use storecraft_core::TenantId;

use crate::envelope::DomainEvent;
use crate::sink::{EventSink, SinkError};

/// A subscription to the events published on an [`InMemoryEventSink`].
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::Receiver<DomainEvent>,
}

impl Subscription {
    /// Try to receive an event without blocking.
    pub fn try_recv(&self) -> Result<DomainEvent, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for an event.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<DomainEvent, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> Vec<DomainEvent> {
        self.receiver.try_iter().collect()
    }
}

/// In-memory pub/sub sink.
///
/// - No IO
/// - Best-effort fan-out to subscribers (dead subscribers are dropped)
/// - Keeps a history of everything published, for assertions
#[derive(Debug, Default)]
pub struct InMemoryEventSink {
    subscribers: Mutex<Vec<mpsc::Sender<DomainEvent>>>,
    history: Mutex<Vec<DomainEvent>>,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel();

        // If the lock is poisoned we still hand out a subscription;
        // it just never receives anything.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription { receiver: rx }
    }

    /// Every event published so far, in publish order.
    pub fn published(&self) -> Vec<DomainEvent> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    /// Published events of one type for one tenant.
    pub fn published_of(&self, tenant_id: TenantId, event_type: &str) -> Vec<DomainEvent> {
        self.published()
            .into_iter()
            .filter(|e| e.tenant_id() == tenant_id && e.event_type() == event_type)
            .collect()
    }
}

impl EventSink for InMemoryEventSink {
    fn publish(&self, event: DomainEvent) -> Result<(), SinkError> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| SinkError::Unavailable("subscriber lock poisoned".to_string()))?;

        // Drop any dead subscribers while publishing.
        subs.retain(|tx| tx.send(event.clone()).is_ok());

        self.history
            .lock()
            .map_err(|_| SinkError::Unavailable("history lock poisoned".to_string()))?
            .push(event);

        Ok(())
    }
}
