//! Read models built from published events.
//!
//! Every projection is:
//! - **Rebuildable**: reconstructed from the event log at startup
//! - **Tenant-isolated**: data is partitioned by tenant
//! - **Idempotent**: per-stream cursors make at-least-once delivery safe

pub mod cursor;
pub mod customers;
pub mod customs;
pub mod invoices;
pub mod notifications;
pub mod routing;
pub mod shipments;
pub mod tickets;
pub mod view;
pub mod warehouses;

use serde_json::Value as JsonValue;

use cargohub_core::{AggregateId, TenantId};
use cargohub_events::EventEnvelope;

use crate::event_store::EventStore;
use crate::read_model::TenantStore;
use crate::streams::StreamKind;

pub use cursor::{ProjectionError, StreamCursors};
pub use customers::CustomersView;
pub use customs::CustomsView;
pub use invoices::{InvoiceFilter, InvoicesView};
pub use notifications::NotificationsView;
pub use routing::{DriversView, RoutesView};
pub use shipments::{ShipmentFilter, ShipmentsView};
pub use tickets::TicketsView;
pub use view::AggregateView;
pub use warehouses::WarehousesView;

/// Object-safe projection surface used for fan-out.
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(true)` when the envelope changed this projection.
    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<bool, ProjectionError>;

    fn clear_tenant(&self, tenant_id: TenantId);
}

impl<A, S> Projection for AggregateView<A, S>
where
    A: StreamKind,
    S: TenantStore<AggregateId, A>,
{
    fn name(&self) -> &'static str {
        A::AGGREGATE_TYPE
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<bool, ProjectionError> {
        AggregateView::apply_envelope(self, envelope)
    }

    fn clear_tenant(&self, tenant_id: TenantId) {
        AggregateView::clear_tenant(self, tenant_id)
    }
}

/// All read models of the service.
#[derive(Debug, Default)]
pub struct ReadModels {
    pub customers: CustomersView,
    pub warehouses: WarehousesView,
    pub shipments: ShipmentsView,
    pub invoices: InvoicesView,
    pub customs: CustomsView,
    pub tickets: TicketsView,
    pub notifications: NotificationsView,
    pub drivers: DriversView,
    pub routes: RoutesView,
}

impl ReadModels {
    pub fn new() -> Self {
        Self::default()
    }

    fn projections(&self) -> [&dyn Projection; 9] {
        [
            &self.customers,
            &self.warehouses,
            &self.shipments,
            &self.invoices,
            &self.customs,
            &self.tickets,
            &self.notifications,
            &self.drivers,
            &self.routes,
        ]
    }

    /// Route one envelope to the projection owning its aggregate type.
    pub fn apply(&self, envelope: &EventEnvelope<JsonValue>) -> Result<bool, ProjectionError> {
        for projection in self.projections() {
            if projection.name() == envelope.aggregate_type() {
                return projection.apply_envelope(envelope);
            }
        }
        Ok(false)
    }

    /// [`apply`](Self::apply), repairing a sequence gap from the store.
    ///
    /// Publication order across concurrent commands on one stream is not
    /// guaranteed; a gap means an earlier event is still in flight, so the
    /// stream is replayed from the store instead.
    pub fn apply_or_catch_up<S>(
        &self,
        store: &S,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<bool, ProjectionError>
    where
        S: EventStore + ?Sized,
    {
        match self.apply(envelope) {
            Err(ProjectionError::NonMonotonicSequence { last, found }) if found > last => {
                tracing::debug!(
                    tenant_id = %envelope.tenant_id(),
                    aggregate_id = %envelope.aggregate_id(),
                    last,
                    found,
                    "projection gap, catching up from store"
                );
                let applied = self.catch_up(store, envelope.tenant_id(), envelope.aggregate_id())?;
                Ok(applied > 0)
            }
            other => other,
        }
    }

    /// Apply every not-yet-seen event of one stream. Returns how many applied.
    pub fn catch_up<S>(
        &self,
        store: &S,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<usize, ProjectionError>
    where
        S: EventStore + ?Sized,
    {
        let stream = store
            .load_stream(tenant_id, aggregate_id)
            .map_err(|e| ProjectionError::CatchUp(e.to_string()))?;

        let mut applied = 0;
        for stored in &stream {
            if self.apply(&stored.to_envelope())? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Drop and replay every tenant present in `envelopes`.
    pub fn rebuild(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<usize, ProjectionError> {
        let mut envs: Vec<_> = envelopes.into_iter().collect();

        let mut tenants: Vec<TenantId> = envs.iter().map(|e| e.tenant_id()).collect();
        tenants.sort_by_key(|t| *t.as_uuid().as_bytes());
        tenants.dedup();
        for t in tenants {
            for projection in self.projections() {
                projection.clear_tenant(t);
            }
        }

        envs.sort_by_key(|e| {
            (
                *e.tenant_id().as_uuid().as_bytes(),
                *e.aggregate_id().as_uuid().as_bytes(),
                e.sequence_number(),
            )
        });

        let mut applied = 0;
        for env in &envs {
            if self.apply(env)? {
                applied += 1;
            }
        }
        Ok(applied)
    }
}


#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use cargohub_customers::{Customer, CustomerCommand, CustomerId, RegisterCustomer};
    use cargohub_shipments::{Shipment, ShipmentStatus};

    use super::shipments::tests::{create, move_to};
    use super::test_support::{dispatcher, run};
    use super::*;

    fn register(tenant_id: TenantId, id: AggregateId) -> CustomerCommand {
        CustomerCommand::RegisterCustomer(RegisterCustomer {
            tenant_id,
            customer_id: CustomerId::new(id),
            name: "Daan Visser".to_string(),
            email: "daan@visser-transport.nl".to_string(),
            phone: None,
            company: Some("Visser Transport".to_string()),
            address: None,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn redelivery_is_ignored() {
        let d = dispatcher();
        let models = ReadModels::new();
        let t = TenantId::new();
        let id = AggregateId::new();
        let envs = run::<Customer>(&d, t, id, register(t, id));

        assert!(models.apply(&envs[0]).unwrap());
        assert!(!models.apply(&envs[0]).unwrap());
        assert_eq!(models.customers.list(t).len(), 1);
        assert!(models.customers.can_ship(t, CustomerId::new(id)));
    }

    #[test]
    fn gap_is_repaired_from_the_store() {
        let d = dispatcher();
        let models = ReadModels::new();
        let t = TenantId::new();
        let id = AggregateId::new();
        let customer = CustomerId::new(AggregateId::new());
        run::<Shipment>(&d, t, id, create(t, id, customer));
        let second = run::<Shipment>(&d, t, id, move_to(t, id, ShipmentStatus::PickedUp));

        assert!(matches!(
            models.apply(&second[0]),
            Err(ProjectionError::NonMonotonicSequence { last: 0, found: 2 })
        ));
        assert!(models.apply_or_catch_up(d.store(), &second[0]).unwrap());

        let shipment = models.shipments.get(t, id).unwrap();
        assert_eq!(shipment.status(), ShipmentStatus::PickedUp);
        assert_eq!(models.shipments.position(t, id), 2);
    }

    #[test]
    fn payload_from_another_tenant_is_rejected() {
        let d = dispatcher();
        let models = ReadModels::new();
        let t = TenantId::new();
        let id = AggregateId::new();
        let envs = run::<Customer>(&d, t, id, register(t, id));

        let forged = EventEnvelope::new(
            Uuid::now_v7(),
            TenantId::new(),
            id,
            "customers.customer",
            1,
            envs[0].payload().clone(),
        );
        assert!(matches!(
            models.apply(&forged),
            Err(ProjectionError::TenantIsolation(_))
        ));
    }

    #[test]
    fn rebuild_replaces_tenant_state() {
        let d = dispatcher();
        let models = ReadModels::new();
        let t = TenantId::new();
        let kept = AggregateId::new();
        let dropped = AggregateId::new();
        let mut kept_envs = run::<Customer>(&d, t, kept, register(t, kept));
        for env in kept_envs.iter().chain(&run::<Customer>(&d, t, dropped, register(t, dropped))) {
            models.apply(env).unwrap();
        }
        assert_eq!(models.customers.list(t).len(), 2);

        let applied = models.rebuild(kept_envs.drain(..)).unwrap();
        assert_eq!(applied, 1);
        assert_eq!(models.customers.list(t).len(), 1);
        assert!(models.customers.get(t, dropped).is_none());
    }

    #[test]
    fn unknown_aggregate_types_are_skipped() {
        let models = ReadModels::new();
        let env = EventEnvelope::new(
            Uuid::now_v7(),
            TenantId::new(),
            AggregateId::new(),
            "billing.ledger",
            1,
            serde_json::json!({}),
        );
        assert!(!models.apply(&env).unwrap());
    }
}
