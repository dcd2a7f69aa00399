//! Generic aggregate-state read model.
//!
//! The view folds published events into the same aggregate type the command
//! side uses, so queries see exactly the state the domain rules see.

use std::marker::PhantomData;

use serde_json::Value as JsonValue;

use cargohub_core::{Aggregate, AggregateId, TenantId};
use cargohub_events::EventEnvelope;

use crate::projections::cursor::{ProjectionError, StreamCursors};
use crate::read_model::{InMemoryTenantStore, TenantStore};
use crate::streams::StreamKind;

#[derive(Debug)]
pub struct AggregateView<A, S = InMemoryTenantStore<AggregateId, A>>
where
    A: StreamKind,
    S: TenantStore<AggregateId, A>,
{
    store: S,
    cursors: StreamCursors,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A> AggregateView<A>
where
    A: StreamKind,
{
    pub fn in_memory() -> Self {
        Self::new(InMemoryTenantStore::new())
    }
}

impl<A> Default for AggregateView<A>
where
    A: StreamKind,
{
    fn default() -> Self {
        Self::in_memory()
    }
}

impl<A, S> AggregateView<A, S>
where
    A: StreamKind,
    S: TenantStore<AggregateId, A>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
            _aggregate: PhantomData,
        }
    }

    pub fn get(&self, tenant_id: TenantId, id: AggregateId) -> Option<A> {
        self.store.get(tenant_id, &id)
    }

    pub fn list(&self, tenant_id: TenantId) -> Vec<A> {
        self.store.list(tenant_id)
    }

    /// Records of a tenant matching `predicate`.
    pub fn filter(&self, tenant_id: TenantId, predicate: impl Fn(&A) -> bool) -> Vec<A> {
        self.list(tenant_id)
            .into_iter()
            .filter(|record| predicate(record))
            .collect()
    }

    /// Last sequence number applied for one stream.
    pub fn position(&self, tenant_id: TenantId, id: AggregateId) -> u64 {
        self.cursors.get(tenant_id, id)
    }

    /// Fold one published envelope into the view.
    ///
    /// Returns `Ok(false)` for envelopes of other aggregate types and for
    /// replays at or below the stream cursor.
    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<bool, ProjectionError> {
        if envelope.aggregate_type() != A::AGGREGATE_TYPE {
            return Ok(false);
        }

        let (tenant_id, aggregate_id) = envelope.stream_key();
        if !self
            .cursors
            .check(tenant_id, aggregate_id, envelope.sequence_number())?
        {
            return Ok(false);
        }

        check_payload_tenant(envelope.payload(), tenant_id)?;

        let event: A::Event = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        let mut state = self
            .store
            .get(tenant_id, &aggregate_id)
            .unwrap_or_else(|| A::empty_stream(aggregate_id));
        state.apply(&event);
        self.store.upsert(tenant_id, aggregate_id, state);
        self.cursors
            .advance(tenant_id, aggregate_id, envelope.sequence_number());

        Ok(true)
    }

    pub fn clear_tenant(&self, tenant_id: TenantId) {
        self.store.clear_tenant(tenant_id);
        self.cursors.clear_tenant(tenant_id);
    }

    /// Rebuild from a full replay.
    ///
    /// Every tenant present in `envelopes` is cleared first. Replay order is
    /// tenant, aggregate, sequence.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionError> {
        let mut envs: Vec<_> = envelopes.into_iter().collect();

        let mut tenants: Vec<TenantId> = envs.iter().map(|e| e.tenant_id()).collect();
        tenants.sort_by_key(|t| *t.as_uuid().as_bytes());
        tenants.dedup();
        for t in tenants {
            self.clear_tenant(t);
        }

        envs.sort_by_key(|e| {
            (
                *e.tenant_id().as_uuid().as_bytes(),
                *e.aggregate_id().as_uuid().as_bytes(),
                e.sequence_number(),
            )
        });
        for env in &envs {
            self.apply_envelope(env)?;
        }
        Ok(())
    }
}

/// Event payloads are `{"Variant": {"tenant_id": .., ..}}`.
fn check_payload_tenant(payload: &JsonValue, tenant_id: TenantId) -> Result<(), ProjectionError> {
    let inner = payload
        .as_object()
        .and_then(|variant| variant.values().next())
        .and_then(|body| body.get("tenant_id"))
        .ok_or_else(|| ProjectionError::Deserialize("payload carries no tenant_id".to_string()))?;

    let event_tenant: TenantId = serde_json::from_value(inner.clone())
        .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
    if event_tenant != tenant_id {
        return Err(ProjectionError::TenantIsolation(
            "event tenant_id does not match envelope tenant_id".to_string(),
        ));
    }
    Ok(())
}
