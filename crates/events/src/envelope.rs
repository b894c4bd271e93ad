use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use storecraft_core::TenantId;

use crate::event::Event;

/// Outbound envelope for a domain event: `{type, tenantId, timestamp, payload}`.
///
/// Notes:
/// - **Multi-tenancy** is carried here via `tenant_id`; sinks must not infer it from
///   the payload.
/// - `payload` is the typed event serialized to JSON, so sinks stay domain-agnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    event_id: Uuid,
    #[serde(rename = "type")]
    event_type: String,
    version: u32,
    tenant_id: TenantId,
    timestamp: DateTime<Utc>,
    payload: JsonValue,
}

impl DomainEvent {
    pub fn new(
        event_type: impl Into<String>,
        tenant_id: TenantId,
        timestamp: DateTime<Utc>,
        payload: JsonValue,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event_type.into(),
            version: 1,
            tenant_id,
            timestamp,
            payload,
        }
    }

    /// Wrap a typed domain event, capturing its type, version, tenant and time.
    pub fn from_typed<E>(event: &E) -> Result<Self, serde_json::Error>
    where
        E: Event + Serialize,
    {
        let payload = serde_json::to_value(event)?;
        Ok(Self {
            event_id: Uuid::now_v7(),
            event_type: event.event_type().to_string(),
            version: event.version(),
            tenant_id: event.tenant_id(),
            timestamp: event.occurred_at(),
            payload,
        })
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn payload(&self) -> &JsonValue {
        &self.payload
    }
}
