//! Binding between domain aggregates and their event streams.
//!
//! Each aggregate kind gets a stable `aggregate_type` tag. The tag is stored
//! with every event and routes envelopes to the right read model.

use serde::Serialize;
use serde::de::DeserializeOwned;

use cargohub_core::{Aggregate, AggregateId, DomainError};
use cargohub_customers::{Customer, CustomerId};
use cargohub_customs::{CustomsDeclaration, DeclarationId};
use cargohub_invoicing::{Invoice, InvoiceId};
use cargohub_notifications::{Notification, NotificationId};
use cargohub_routing::{DeliveryRoute, Driver, DriverId, RouteId};
use cargohub_shipments::{Shipment, ShipmentId};
use cargohub_support::{SupportTicket, TicketId};
use cargohub_warehouses::{Warehouse, WarehouseId};

/// An aggregate that can be stored as an event stream.
pub trait StreamKind:
    Aggregate<Error = DomainError, Event: cargohub_events::Event + Serialize + DeserializeOwned>
    + Clone
    + Send
    + Sync
    + 'static
{
    /// Stable tag persisted with each event, e.g. `shipments.shipment`.
    const AGGREGATE_TYPE: &'static str;

    /// Fresh, not-yet-created instance for rehydration.
    fn empty_stream(id: AggregateId) -> Self;
}

macro_rules! stream_kind {
    ($aggregate:ty, $id:ident, $tag:literal) => {
        impl StreamKind for $aggregate {
            const AGGREGATE_TYPE: &'static str = $tag;

            fn empty_stream(id: AggregateId) -> Self {
                <$aggregate>::empty($id::new(id))
            }
        }
    };
}

stream_kind!(Customer, CustomerId, "customers.customer");
stream_kind!(Warehouse, WarehouseId, "warehouses.warehouse");
stream_kind!(Shipment, ShipmentId, "shipments.shipment");
stream_kind!(Invoice, InvoiceId, "invoicing.invoice");
stream_kind!(CustomsDeclaration, DeclarationId, "customs.declaration");
stream_kind!(SupportTicket, TicketId, "support.ticket");
stream_kind!(Notification, NotificationId, "notifications.notification");
stream_kind!(Driver, DriverId, "routing.driver");
stream_kind!(DeliveryRoute, RouteId, "routing.route");
