//! End-to-end pipeline tests.
//!
//! Command → EventStore → EventBus → worker → ReadModels (+ reactor)

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use chrono::Utc;
    use serde_json::Value as JsonValue;

    use cargohub_core::{Address, AggregateId, Rate, TenantId};
    use cargohub_customers::{Customer, CustomerCommand, CustomerId, RegisterCustomer};
    use cargohub_events::{EventEnvelope, InMemoryEventBus};
    use cargohub_invoicing::{
        Discount, Invoice, InvoiceCommand, InvoiceId, InvoiceLine, InvoiceStatus, IssueInvoice,
        RegisterPayment,
    };
    use cargohub_shipments::{
        CancelShipment, CreateShipment, Shipment, ShipmentCommand, ShipmentId, ShipmentStatus,
        UpdateShipmentStatus,
    };
    use cargohub_warehouses::WarehouseId;

    use crate::command_dispatcher::{CommandDispatcher, DispatchError};
    use crate::event_store::{EventStore, InMemoryEventStore};
    use crate::projections::{InvoiceFilter, ReadModels, ShipmentFilter};
    use crate::workers::{EventPipeline, ProjectionWorker, WorkerHandle};

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
    type Dispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Bus>;

    struct Harness {
        dispatcher: Arc<Dispatcher>,
        models: Arc<ReadModels>,
        worker: WorkerHandle,
    }

    fn setup() -> Harness {
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let dispatcher = Arc::new(CommandDispatcher::new(Arc::new(InMemoryEventStore::new()), bus.clone()));
        let models = Arc::new(ReadModels::new());
        let pipeline = EventPipeline::new(dispatcher.clone(), models.clone());

        let worker = ProjectionWorker::spawn("test-pipeline", &bus, None, move |env: EventEnvelope<JsonValue>| {
            pipeline.handle(&env).map(|_| ())
        })
        .unwrap();

        Harness {
            dispatcher,
            models,
            worker,
        }
    }

    /// Poll until `check` holds; projections are eventually consistent.
    fn eventually(check: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if check() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    fn register_customer(h: &Harness, t: TenantId) -> CustomerId {
        let id = AggregateId::new();
        h.dispatcher
            .execute::<Customer>(
                t,
                id,
                CustomerCommand::RegisterCustomer(RegisterCustomer {
                    tenant_id: t,
                    customer_id: CustomerId::new(id),
                    name: "Noor Jansen".to_string(),
                    email: "noor@jansen-logistiek.nl".to_string(),
                    phone: Some("+31 10 123 4567".to_string()),
                    company: Some("Jansen Logistiek".to_string()),
                    address: None,
                    occurred_at: Utc::now(),
                }),
            )
            .unwrap();
        CustomerId::new(id)
    }

    fn book_shipment(h: &Harness, t: TenantId, customer_id: CustomerId) -> ShipmentId {
        let id = ShipmentId::new(AggregateId::new());
        h.dispatcher
            .execute::<Shipment>(
                t,
                id.0,
                ShipmentCommand::CreateShipment(CreateShipment {
                    tenant_id: t,
                    shipment_id: id,
                    customer_id,
                    origin_warehouse_id: WarehouseId::new(AggregateId::new()),
                    destination_warehouse_id: WarehouseId::new(AggregateId::new()),
                    origin_location: None,
                    recipient_name: "Emma de Boer".to_string(),
                    delivery_address: Address {
                        line1: "Coolsingel 40".to_string(),
                        line2: None,
                        city: "Rotterdam".to_string(),
                        postal_code: Some("3011 AD".to_string()),
                        country: "NL".to_string(),
                    },
                    weight_grams: 18_000,
                    declared_value: 45_000,
                    description: "pallet of ceramics".to_string(),
                    occurred_at: Utc::now(),
                }),
            )
            .unwrap();
        id
    }

    #[test]
    fn shipment_lifecycle_reaches_read_models_and_notifications() {
        let h = setup();
        let t = TenantId::new();
        let customer = register_customer(&h, t);
        let shipment = book_shipment(&h, t, customer);

        h.dispatcher
            .execute::<Shipment>(
                t,
                shipment.0,
                ShipmentCommand::UpdateShipmentStatus(UpdateShipmentStatus {
                    tenant_id: t,
                    shipment_id: shipment,
                    status: ShipmentStatus::OutForDelivery,
                    location: "Rotterdam depot".to_string(),
                    note: Some("loaded on van 4".to_string()),
                    occurred_at: Utc::now(),
                }),
            )
            .unwrap();

        assert!(eventually(|| {
            h.models
                .shipments
                .get(t, shipment.0)
                .is_some_and(|s| s.status() == ShipmentStatus::OutForDelivery)
        }));
        let tracked = h
            .models
            .shipments
            .by_tracking_number(t, &shipment.tracking_number())
            .unwrap();
        // pending + picked_up + in_transit + at_warehouse + out_for_delivery
        assert_eq!(tracked.history().len(), 5);

        assert!(eventually(|| h.models.notifications.inbox(t, Some(customer), true).len() == 2));
        let inbox = h.models.notifications.inbox(t, Some(customer), false);
        assert!(inbox.iter().any(|n| n.kind() == "shipment.created"));
        assert!(inbox.iter().any(|n| n.kind() == "shipment.status_changed"));

        h.worker.shutdown();
    }

    #[test]
    fn tenants_never_see_each_other() {
        let h = setup();
        let (a, b) = (TenantId::new(), TenantId::new());
        let customer = register_customer(&h, a);
        let shipment = book_shipment(&h, a, customer);
        register_customer(&h, b);

        assert!(eventually(|| h.models.customers.list(b).len() == 1));
        assert!(eventually(|| h.models.shipments.get(a, shipment.0).is_some()));
        assert!(h.models.shipments.get(b, shipment.0).is_none());
        assert!(h.models.shipments.search(b, ShipmentFilter::default()).is_empty());

        let err = h
            .dispatcher
            .execute::<Shipment>(
                b,
                shipment.0,
                ShipmentCommand::CancelShipment(CancelShipment {
                    tenant_id: b,
                    shipment_id: shipment,
                    reason: "not ours".to_string(),
                    occurred_at: Utc::now(),
                }),
            )
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound));

        h.worker.shutdown();
    }

    #[test]
    fn paid_invoice_projection_and_rebuild_agree() {
        let h = setup();
        let t = TenantId::new();
        let customer = register_customer(&h, t);
        let invoice = InvoiceId::new(AggregateId::new());

        h.dispatcher
            .execute::<Invoice>(
                t,
                invoice.0,
                InvoiceCommand::IssueInvoice(IssueInvoice {
                    tenant_id: t,
                    invoice_id: invoice,
                    customer_id: customer,
                    shipment_id: None,
                    currency: "EUR".to_string(),
                    lines: vec![InvoiceLine {
                        description: "Road freight RTM→AMS".to_string(),
                        quantity: 2,
                        unit_price: 10_000,
                        discount: Discount::None,
                        tax_rate: Rate::new(2_100).unwrap(),
                    }],
                    due_date: Utc::now() + chrono::Duration::days(30),
                    occurred_at: Utc::now(),
                }),
            )
            .unwrap();
        h.dispatcher
            .execute::<Invoice>(
                t,
                invoice.0,
                InvoiceCommand::RegisterPayment(RegisterPayment {
                    tenant_id: t,
                    invoice_id: invoice,
                    amount: 24_200,
                    reference: Some("SEPA-2291".to_string()),
                    occurred_at: Utc::now(),
                }),
            )
            .unwrap();

        let paid = InvoiceFilter {
            status: Some(InvoiceStatus::Paid),
            customer_id: Some(customer),
        };
        assert!(eventually(|| h.models.invoices.search(t, paid).len() == 1));

        let replayed = ReadModels::new();
        let log = h.dispatcher.store().load_all().unwrap();
        replayed
            .rebuild(log.iter().map(|e| e.to_envelope()))
            .unwrap();
        assert_eq!(replayed.invoices.search(t, paid).len(), 1);
        assert_eq!(replayed.invoices.customer_balance(t, customer), 0);
        assert_eq!(
            replayed.customers.get(t, customer.0),
            h.models.customers.get(t, customer.0)
        );

        h.worker.shutdown();
    }
}
