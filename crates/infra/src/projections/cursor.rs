//! Per-stream projection cursors.
//!
//! A cursor is the last `sequence_number` applied for a `(tenant, aggregate)`
//! stream. Envelopes at or below it are replays and are skipped, which makes
//! every projection safe under at-least-once delivery.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use cargohub_core::{AggregateId, TenantId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("failed to deserialize event payload: {0}")]
    Deserialize(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    /// A gap in the stream: the projection must catch up from the store.
    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    /// The event store failed while a projection was catching up.
    #[error("catch-up read failed: {0}")]
    CatchUp(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Default)]
pub struct StreamCursors {
    inner: RwLock<HashMap<CursorKey, u64>>,
}

impl StreamCursors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last applied sequence number, 0 for an unseen stream.
    pub fn get(&self, tenant_id: TenantId, aggregate_id: AggregateId) -> u64 {
        match self.inner.read() {
            Ok(cursors) => cursors
                .get(&CursorKey {
                    tenant_id,
                    aggregate_id,
                })
                .copied()
                .unwrap_or(0),
            Err(_) => 0,
        }
    }

    pub fn advance(&self, tenant_id: TenantId, aggregate_id: AggregateId, sequence_number: u64) {
        if let Ok(mut cursors) = self.inner.write() {
            cursors.insert(
                CursorKey {
                    tenant_id,
                    aggregate_id,
                },
                sequence_number,
            );
        }
    }

    pub fn clear_tenant(&self, tenant_id: TenantId) {
        if let Ok(mut cursors) = self.inner.write() {
            cursors.retain(|k, _| k.tenant_id != tenant_id);
        }
    }

    /// Check where `found` falls relative to the cursor.
    ///
    /// `Ok(false)` means the envelope was already applied.
    pub fn check(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        found: u64,
    ) -> Result<bool, ProjectionError> {
        let last = self.get(tenant_id, aggregate_id);
        if found == 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found });
        }
        if found <= last {
            return Ok(false);
        }
        if found != last + 1 {
            return Err(ProjectionError::NonMonotonicSequence { last, found });
        }
        Ok(true)
    }
}
