//! Shipment queries: status and customer filters, tracking-number lookup.

use cargohub_core::{AggregateId, TenantId};
use cargohub_customers::CustomerId;
use cargohub_shipments::{Shipment, ShipmentStatus};

use crate::projections::view::AggregateView;
use crate::read_model::{InMemoryTenantStore, TenantStore};

pub type ShipmentsView<S = InMemoryTenantStore<AggregateId, Shipment>> = AggregateView<Shipment, S>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShipmentFilter {
    pub status: Option<ShipmentStatus>,
    pub customer_id: Option<CustomerId>,
}

impl ShipmentFilter {
    pub fn matches(&self, shipment: &Shipment) -> bool {
        self.status.is_none_or(|s| shipment.status() == s)
            && self
                .customer_id
                .is_none_or(|c| shipment.customer_id() == Some(c))
    }
}

impl<S> AggregateView<Shipment, S>
where
    S: TenantStore<AggregateId, Shipment>,
{
    /// Matching shipments, most recently booked first.
    pub fn search(&self, tenant_id: TenantId, filter: ShipmentFilter) -> Vec<Shipment> {
        let mut shipments = self.filter(tenant_id, |s| filter.matches(s));
        shipments.sort_by(|a, b| {
            booked_at(b)
                .cmp(&booked_at(a))
                .then_with(|| a.tracking_number().cmp(b.tracking_number()))
        });
        shipments
    }

    /// Case-insensitive tracking-number lookup within one tenant.
    pub fn by_tracking_number(&self, tenant_id: TenantId, tracking_number: &str) -> Option<Shipment> {
        let needle = tracking_number.trim();
        self.list(tenant_id)
            .into_iter()
            .find(|s| s.tracking_number().eq_ignore_ascii_case(needle))
    }
}

fn booked_at(shipment: &Shipment) -> Option<chrono::DateTime<chrono::Utc>> {
    shipment.history().first().map(|e| e.recorded_at)
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Utc;

    use cargohub_core::Address;
    use cargohub_shipments::{
        CreateShipment, ShipmentCommand, ShipmentId, UpdateShipmentStatus,
    };
    use cargohub_warehouses::WarehouseId;

    use super::*;
    use crate::projections::test_support::{TestDispatcher, dispatcher, run};

    pub(crate) fn create(tenant_id: TenantId, id: AggregateId, customer_id: CustomerId) -> ShipmentCommand {
        ShipmentCommand::CreateShipment(CreateShipment {
            tenant_id,
            shipment_id: ShipmentId::new(id),
            customer_id,
            origin_warehouse_id: WarehouseId::new(AggregateId::new()),
            destination_warehouse_id: WarehouseId::new(AggregateId::new()),
            origin_location: Some("RTM-01 Rotterdam".to_string()),
            recipient_name: "Sanne Bakker".to_string(),
            delivery_address: Address {
                line1: "Oudegracht 12".to_string(),
                line2: None,
                city: "Utrecht".to_string(),
                postal_code: Some("3511 AP".to_string()),
                country: "NL".to_string(),
            },
            weight_grams: 2_500,
            declared_value: 12_000,
            description: "spare parts".to_string(),
            occurred_at: Utc::now(),
        })
    }

    pub(crate) fn move_to(tenant_id: TenantId, id: AggregateId, status: ShipmentStatus) -> ShipmentCommand {
        ShipmentCommand::UpdateShipmentStatus(UpdateShipmentStatus {
            tenant_id,
            shipment_id: ShipmentId::new(id),
            status,
            location: "Utrecht hub".to_string(),
            note: None,
            occurred_at: Utc::now(),
        })
    }

    fn book(d: &TestDispatcher, view: &ShipmentsView, t: TenantId, customer_id: CustomerId) -> AggregateId {
        let id = AggregateId::new();
        for env in run::<Shipment>(d, t, id, create(t, id, customer_id)) {
            view.apply_envelope(&env).unwrap();
        }
        id
    }

    #[test]
    fn search_filters_by_status_and_customer() {
        let d = dispatcher();
        let view = ShipmentsView::in_memory();
        let t = TenantId::new();
        let alice = CustomerId::new(AggregateId::new());
        let bob = CustomerId::new(AggregateId::new());

        let first = book(&d, &view, t, alice);
        book(&d, &view, t, alice);
        book(&d, &view, t, bob);
        for env in run::<Shipment>(&d, t, first, move_to(t, first, ShipmentStatus::InTransit)) {
            view.apply_envelope(&env).unwrap();
        }

        let in_transit = view.search(
            t,
            ShipmentFilter {
                status: Some(ShipmentStatus::InTransit),
                customer_id: None,
            },
        );
        assert_eq!(in_transit.len(), 1);
        assert_eq!(in_transit[0].history().len(), 3);

        let for_alice = view.search(
            t,
            ShipmentFilter {
                status: None,
                customer_id: Some(alice),
            },
        );
        assert_eq!(for_alice.len(), 2);
        assert!(view.search(TenantId::new(), ShipmentFilter::default()).is_empty());
    }

    #[test]
    fn tracking_lookup_is_case_insensitive_and_tenant_scoped() {
        let d = dispatcher();
        let view = ShipmentsView::in_memory();
        let t = TenantId::new();
        let id = book(&d, &view, t, CustomerId::new(AggregateId::new()));
        let tracking = ShipmentId::new(id).tracking_number();

        let found = view.by_tracking_number(t, &tracking.to_lowercase()).unwrap();
        assert_eq!(found.tracking_number(), tracking);
        assert!(view.by_tracking_number(TenantId::new(), &tracking).is_none());
    }
}
