//! Command execution pipeline for event-sourced aggregates.
//!
//! ```text
//! command
//!   -> load stream (tenant-scoped)
//!   -> rehydrate aggregate
//!   -> handle (pure decision)
//!   -> append with ExpectedVersion::Exact(current)
//!   -> publish committed envelopes to the bus
//! ```
//!
//! Publication happens only after a successful append. A publish failure
//! leaves the events stored; delivery is at-least-once.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use cargohub_core::{Aggregate, AggregateId, DomainError, ExpectedVersion, TenantId};
use cargohub_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
use crate::streams::StreamKind;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Optimistic concurrency failure or a domain-level conflict.
    #[error("conflict: {0}")]
    Concurrency(String),
    /// Cross-tenant or cross-stream data surfaced during load or append.
    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    /// Stored payload could not be read back as the aggregate's event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),
    #[error(transparent)]
    Store(EventStoreError),
    /// Events are stored but the bus rejected them.
    #[error("publication failed after append: {0}")]
    Publish(String),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            EventStoreError::TenantIsolation(msg) => DispatchError::TenantIsolation(msg),
            EventStoreError::Publish(msg) => DispatchError::Publish(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::Unauthorized => DispatchError::Unauthorized,
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
        }
    }
}

/// Reusable command execution engine.
///
/// Generic over the store and bus so tests run against the in-memory pair
/// and production swaps in Postgres without touching domain code.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Run one command against one aggregate stream.
    ///
    /// Returns the committed events with their sequence numbers. A command
    /// that decides no events commits nothing and returns an empty vector.
    pub fn dispatch<A>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: cargohub_events::Event + Serialize + DeserializeOwned,
    {
        let history = self.store.load_stream(tenant_id, aggregate_id)?;
        validate_loaded_stream(tenant_id, aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        let mut aggregate = make_aggregate(aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;

        let decided = aggregate.handle(&command).map_err(DispatchError::from)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(
                    tenant_id,
                    aggregate_id,
                    aggregate_type,
                    Uuid::now_v7(),
                    ev,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;

        tracing::debug!(
            tenant_id = %tenant_id,
            aggregate_type,
            aggregate_id = %aggregate_id,
            committed = committed.len(),
            "command dispatched"
        );

        for stored in &committed {
            self.bus
                .publish(stored.to_envelope())
                .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
        }

        Ok(committed)
    }

    /// [`dispatch`](Self::dispatch) for an aggregate with a registered stream kind.
    pub fn execute<A: StreamKind>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        command: A::Command,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatch::<A>(
            tenant_id,
            aggregate_id,
            A::AGGREGATE_TYPE,
            command,
            A::empty_stream,
        )
    }

    /// Rehydrate an aggregate without deciding anything.
    pub fn load<A: StreamKind>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<A, DispatchError> {
        let history = self.store.load_stream(tenant_id, aggregate_id)?;
        validate_loaded_stream(tenant_id, aggregate_id, &history)?;
        let mut aggregate = A::empty_stream(aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;
        Ok(aggregate)
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(
    tenant_id: TenantId,
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    // A misbehaving backend must not leak another tenant's history into a decision.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.tenant_id != tenant_id {
            return Err(DispatchError::TenantIsolation(format!(
                "loaded stream contains wrong tenant_id at index {idx}"
            )));
        }
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::TenantIsolation(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use chrono::Utc;
    use cargohub_core::AggregateRoot;
    use cargohub_customers::{
        Customer, CustomerCommand, CustomerId, RegisterCustomer, SuspendCustomer,
    };
    use cargohub_events::InMemoryEventBus;

    use crate::event_store::InMemoryEventStore;

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

    fn dispatcher() -> CommandDispatcher<Arc<InMemoryEventStore>, Bus> {
        CommandDispatcher::new(Arc::new(InMemoryEventStore::new()), Arc::new(InMemoryEventBus::new()))
    }

    fn register(tenant_id: TenantId, id: AggregateId) -> CustomerCommand {
        CustomerCommand::RegisterCustomer(RegisterCustomer {
            tenant_id,
            customer_id: CustomerId::new(id),
            name: "Lotte de Vries".to_string(),
            email: "lotte@example.nl".to_string(),
            phone: None,
            company: None,
            address: None,
            occurred_at: Utc::now(),
        })
    }

    fn suspend(tenant_id: TenantId, id: AggregateId) -> CustomerCommand {
        CustomerCommand::SuspendCustomer(SuspendCustomer {
            tenant_id,
            customer_id: CustomerId::new(id),
            reason: Some("unpaid invoices".to_string()),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn dispatch_persists_then_publishes() {
        let d = dispatcher();
        let sub = d.bus().subscribe();
        let t = TenantId::new();
        let id = AggregateId::new();

        let committed = d.execute::<Customer>(t, id, register(t, id)).unwrap();
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].sequence_number, 1);
        assert_eq!(committed[0].aggregate_type, "customers.customer");
        assert_eq!(committed[0].event_type, "customers.customer.registered");

        let env = sub.try_recv().unwrap();
        assert_eq!(env.sequence_number(), 1);
        assert_eq!(env.tenant_id(), t);
    }

    #[test]
    fn history_is_rehydrated_before_deciding() {
        let d = dispatcher();
        let t = TenantId::new();
        let id = AggregateId::new();
        d.execute::<Customer>(t, id, register(t, id)).unwrap();
        d.execute::<Customer>(t, id, suspend(t, id)).unwrap();

        let err = d.execute::<Customer>(t, id, suspend(t, id)).unwrap_err();
        assert!(matches!(err, DispatchError::Concurrency(_)));

        let customer = d.load::<Customer>(t, id).unwrap();
        assert_eq!(customer.version(), 2);
        assert!(!customer.can_ship());
    }

    #[test]
    fn other_tenants_do_not_see_the_stream() {
        let d = dispatcher();
        let t = TenantId::new();
        let id = AggregateId::new();
        d.execute::<Customer>(t, id, register(t, id)).unwrap();

        let other = TenantId::new();
        let err = d.execute::<Customer>(other, id, suspend(other, id)).unwrap_err();
        assert!(matches!(err, DispatchError::NotFound));
    }

    #[test]
    fn duplicate_creation_is_a_conflict() {
        let d = dispatcher();
        let t = TenantId::new();
        let id = AggregateId::new();
        d.execute::<Customer>(t, id, register(t, id)).unwrap();
        let err = d.execute::<Customer>(t, id, register(t, id)).unwrap_err();
        assert!(matches!(err, DispatchError::Concurrency(_)));
    }
}
