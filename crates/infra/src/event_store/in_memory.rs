use std::collections::HashMap;
use std::sync::RwLock;

use cargohub_core::{AggregateId, ExpectedVersion, TenantId};

use super::query::{EventFilter, EventQuery, EventQueryResult, Pagination};
use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent, validate_batch};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

/// In-memory append-only event store.
///
/// The default backend for development and tests. Contents are lost on exit.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamKey, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }

    fn tenant_events(
        &self,
        tenant_id: TenantId,
        filter: &EventFilter,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::Backend("lock poisoned".to_string()))?;

        Ok(streams
            .iter()
            .filter(|(key, _)| key.tenant_id == tenant_id)
            .flat_map(|(_, stream)| stream.iter())
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(first) = events.first() else {
            return Ok(vec![]);
        };
        validate_batch(&events)?;

        let key = StreamKey {
            tenant_id: first.tenant_id,
            aggregate_id: first.aggregate_id,
        };
        let aggregate_type = first.aggregate_type.clone();

        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::Backend("lock poisoned".to_string()))?;

        let stream = streams.entry(key).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        if let Some(existing) = stream.first() {
            if existing.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    existing.aggregate_type, aggregate_type
                )));
            }
        }

        let mut committed = Vec::with_capacity(events.len());
        for (offset, e) in events.into_iter().enumerate() {
            let stored = StoredEvent {
                event_id: e.event_id,
                tenant_id: e.tenant_id,
                aggregate_id: e.aggregate_id,
                aggregate_type: e.aggregate_type,
                sequence_number: current + offset as u64 + 1,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            };
            stream.push(stored.clone());
            committed.push(stored);
        }

        Ok(committed)
    }

    fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let key = StreamKey {
            tenant_id,
            aggregate_id,
        };

        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::Backend("lock poisoned".to_string()))?;

        Ok(streams.get(&key).cloned().unwrap_or_default())
    }

    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::Backend("lock poisoned".to_string()))?;

        Ok(streams.values().flat_map(|s| s.iter().cloned()).collect())
    }
}

#[async_trait::async_trait]
impl EventQuery for InMemoryEventStore {
    async fn query_events(
        &self,
        tenant_id: TenantId,
        filter: EventFilter,
        pagination: Pagination,
    ) -> Result<EventQueryResult, EventStoreError> {
        let mut events = self.tenant_events(tenant_id, &filter)?;
        // Newest first; ties keep stream order.
        events.sort_by(|a, b| {
            b.occurred_at
                .cmp(&a.occurred_at)
                .then(a.sequence_number.cmp(&b.sequence_number))
        });
        Ok(EventQueryResult::page(events, pagination))
    }

    async fn get_aggregate_events(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        pagination: Option<Pagination>,
    ) -> Result<EventQueryResult, EventStoreError> {
        let events = self.load_stream(tenant_id, aggregate_id)?;
        Ok(EventQueryResult::page(events, pagination.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn uncommitted(tenant_id: TenantId, aggregate_id: AggregateId, ty: &str) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            tenant_id,
            aggregate_id,
            aggregate_type: ty.to_string(),
            event_type: format!("{ty}.touched"),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: json!({ "n": 1 }),
        }
    }

    #[test]
    fn append_assigns_contiguous_sequence_numbers() {
        let store = InMemoryEventStore::new();
        let t = TenantId::new();
        let a = AggregateId::new();

        let first = store
            .append(
                vec![uncommitted(t, a, "x.y"), uncommitted(t, a, "x.y")],
                ExpectedVersion::Exact(0),
            )
            .unwrap();
        let second = store
            .append(vec![uncommitted(t, a, "x.y")], ExpectedVersion::Exact(2))
            .unwrap();

        let seqs: Vec<_> = first.iter().chain(&second).map(|e| e.sequence_number).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(store.load_stream(t, a).unwrap().len(), 3);
    }

    #[test]
    fn stale_expected_version_is_a_concurrency_error() {
        let store = InMemoryEventStore::new();
        let t = TenantId::new();
        let a = AggregateId::new();
        store
            .append(vec![uncommitted(t, a, "x.y")], ExpectedVersion::Exact(0))
            .unwrap();

        let err = store
            .append(vec![uncommitted(t, a, "x.y")], ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
    }

    #[test]
    fn mixed_tenant_batch_is_rejected() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let err = store
            .append(
                vec![
                    uncommitted(TenantId::new(), a, "x.y"),
                    uncommitted(TenantId::new(), a, "x.y"),
                ],
                ExpectedVersion::Any,
            )
            .unwrap_err();
        assert!(matches!(err, EventStoreError::TenantIsolation(_)));
    }

    #[test]
    fn aggregate_type_is_stable_per_stream() {
        let store = InMemoryEventStore::new();
        let t = TenantId::new();
        let a = AggregateId::new();
        store
            .append(vec![uncommitted(t, a, "x.y")], ExpectedVersion::Any)
            .unwrap();
        let err = store
            .append(vec![uncommitted(t, a, "x.z")], ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));
    }

    #[test]
    fn streams_are_tenant_scoped() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let t = TenantId::new();
        store
            .append(vec![uncommitted(t, a, "x.y")], ExpectedVersion::Any)
            .unwrap();

        assert!(store.load_stream(TenantId::new(), a).unwrap().is_empty());
        assert_eq!(store.load_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn query_filters_by_tenant_and_type_and_paginates() {
        let store = InMemoryEventStore::new();
        let t = TenantId::new();
        for _ in 0..3 {
            store
                .append(vec![uncommitted(t, AggregateId::new(), "x.y")], ExpectedVersion::Any)
                .unwrap();
        }
        store
            .append(vec![uncommitted(t, AggregateId::new(), "x.z")], ExpectedVersion::Any)
            .unwrap();
        store
            .append(
                vec![uncommitted(TenantId::new(), AggregateId::new(), "x.y")],
                ExpectedVersion::Any,
            )
            .unwrap();

        let filter = EventFilter {
            aggregate_type: Some("x.y".to_string()),
            ..Default::default()
        };
        let page = store
            .query_events(t, filter, Pagination::new(Some(2), Some(0)))
            .await
            .unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.events.len(), 2);
        assert!(page.has_more);
    }
}
