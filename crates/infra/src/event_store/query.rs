//! Read-only event inspection.
//!
//! Queries are tenant-scoped and always paginated. They serve the raw history
//! endpoint; command handling never goes through here.

use chrono::{DateTime, Utc};
use cargohub_core::{AggregateId, TenantId};
use serde::{Deserialize, Serialize};

use crate::event_store::{EventStoreError, StoredEvent};

/// Pagination parameters for event queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of events to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).min(Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Filter criteria for event queries. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    pub aggregate_id: Option<AggregateId>,
    /// e.g. `shipments.shipment`
    pub aggregate_type: Option<String>,
    /// e.g. `shipments.shipment.status_updated`
    pub event_type: Option<String>,
    pub occurred_after: Option<DateTime<Utc>>,
    pub occurred_before: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn matches(&self, event: &StoredEvent) -> bool {
        self.aggregate_id.is_none_or(|id| event.aggregate_id == id)
            && self
                .aggregate_type
                .as_deref()
                .is_none_or(|t| event.aggregate_type == t)
            && self
                .event_type
                .as_deref()
                .is_none_or(|t| event.event_type == t)
            && self.occurred_after.is_none_or(|at| event.occurred_at >= at)
            && self.occurred_before.is_none_or(|at| event.occurred_at <= at)
    }
}

/// Paginated event query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventQueryResult {
    pub events: Vec<StoredEvent>,
    /// Number of events matching the filter across all pages.
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

impl EventQueryResult {
    /// Cut one page out of an already ordered result set.
    pub fn page(all: Vec<StoredEvent>, pagination: Pagination) -> Self {
        let total = all.len() as u64;
        let events: Vec<_> = all
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();
        let has_more = total > u64::from(pagination.offset) + u64::from(pagination.limit);

        Self {
            events,
            total,
            pagination,
            has_more,
        }
    }
}

/// Async query interface for event inspection.
#[async_trait::async_trait]
pub trait EventQuery: Send + Sync {
    /// Events matching `filter`, newest first (stream order for equal timestamps).
    async fn query_events(
        &self,
        tenant_id: TenantId,
        filter: EventFilter,
        pagination: Pagination,
    ) -> Result<EventQueryResult, EventStoreError>;

    /// One aggregate stream in sequence order.
    async fn get_aggregate_events(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        pagination: Option<Pagination>,
    ) -> Result<EventQueryResult, EventStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_capped() {
        assert_eq!(Pagination::new(Some(5000), None).limit, Pagination::MAX_LIMIT);
        assert_eq!(Pagination::default().limit, Pagination::DEFAULT_LIMIT);
    }
}
