use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use cargohub_core::{AggregateId, TenantId};

/// Tenant-scoped envelope around a published event.
///
/// `sequence_number` is the event's position in its aggregate stream and is
/// what projections use as an idempotency cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    tenant_id: TenantId,

    aggregate_id: AggregateId,
    aggregate_type: String,

    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            tenant_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    /// Identity of the stream this envelope belongs to.
    pub fn stream_key(&self) -> (TenantId, AggregateId) {
        (self.tenant_id, self.aggregate_id)
    }

    /// True for the creating event of a stream.
    pub fn opens_stream(&self) -> bool {
        self.sequence_number == 1
    }
}

impl EventEnvelope<JsonValue> {
    /// Variant name of an externally tagged payload, e.g. `ShipmentCreated`.
    pub fn event_name(&self) -> Option<&str> {
        match self.payload.as_object() {
            Some(fields) if fields.len() == 1 => fields.keys().next().map(String::as_str),
            _ => None,
        }
    }
}
