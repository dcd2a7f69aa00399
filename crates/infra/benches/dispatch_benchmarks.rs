use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use chrono::Utc;
use serde_json::Value as JsonValue;

use cargohub_core::{Address, AggregateId, TenantId};
use cargohub_customers::{Customer, CustomerCommand, CustomerId, RegisterCustomer, UpdateCustomer};
use cargohub_events::{EventEnvelope, InMemoryEventBus};
use cargohub_infra::command_dispatcher::CommandDispatcher;
use cargohub_infra::event_store::InMemoryEventStore;
use cargohub_infra::projections::ReadModels;
use cargohub_shipments::{
    CreateShipment, Shipment, ShipmentCommand, ShipmentId, ShipmentStatus, UpdateShipmentStatus,
};
use cargohub_warehouses::WarehouseId;

type Dispatcher =
    CommandDispatcher<Arc<InMemoryEventStore>, Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>>;

fn dispatcher() -> Dispatcher {
    CommandDispatcher::new(Arc::new(InMemoryEventStore::new()), Arc::new(InMemoryEventBus::new()))
}

fn register(tenant_id: TenantId, id: AggregateId) -> CustomerCommand {
    CustomerCommand::RegisterCustomer(RegisterCustomer {
        tenant_id,
        customer_id: CustomerId::new(id),
        name: "Bench Freight BV".to_string(),
        email: "ops@benchfreight.nl".to_string(),
        phone: None,
        company: None,
        address: None,
        occurred_at: Utc::now(),
    })
}

fn create_shipment(tenant_id: TenantId, id: AggregateId) -> ShipmentCommand {
    ShipmentCommand::CreateShipment(CreateShipment {
        tenant_id,
        shipment_id: ShipmentId::new(id),
        customer_id: CustomerId::new(AggregateId::new()),
        origin_warehouse_id: WarehouseId::new(AggregateId::new()),
        destination_warehouse_id: WarehouseId::new(AggregateId::new()),
        origin_location: Some("RTM-01".to_string()),
        recipient_name: "Receiving desk".to_string(),
        delivery_address: Address {
            line1: "Industrieweg 7".to_string(),
            line2: None,
            city: "Tilburg".to_string(),
            postal_code: None,
            country: "NL".to_string(),
        },
        weight_grams: 1_000,
        declared_value: 5_000,
        description: "cartons".to_string(),
        occurred_at: Utc::now(),
    })
}

fn bench_dispatch_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_latency");

    group.bench_function("register_customer_fresh", |b| {
        let d = dispatcher();
        let tenant_id = TenantId::new();
        b.iter(|| {
            let id = AggregateId::new();
            black_box(d.execute::<Customer>(tenant_id, id, register(tenant_id, id)).unwrap());
        });
    });

    group.bench_function("update_customer_with_history", |b| {
        let d = dispatcher();
        let tenant_id = TenantId::new();
        let id = AggregateId::new();
        d.execute::<Customer>(tenant_id, id, register(tenant_id, id)).unwrap();

        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            let cmd = CustomerCommand::UpdateCustomer(UpdateCustomer {
                tenant_id,
                customer_id: CustomerId::new(id),
                name: Some(format!("Bench Freight BV {n}")),
                email: None,
                phone: None,
                company: None,
                address: None,
                occurred_at: Utc::now(),
            });
            black_box(d.execute::<Customer>(tenant_id, id, cmd).unwrap());
        });
    });

    group.finish();
}

fn bench_projection_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection_rebuild");

    for shipments in [10usize, 100, 1000] {
        let d = dispatcher();
        let tenant_id = TenantId::new();
        let mut envelopes = Vec::new();
        for _ in 0..shipments {
            let id = AggregateId::new();
            let commands = [
                create_shipment(tenant_id, id),
                ShipmentCommand::UpdateShipmentStatus(UpdateShipmentStatus {
                    tenant_id,
                    shipment_id: ShipmentId::new(id),
                    status: ShipmentStatus::InTransit,
                    location: "A16 corridor".to_string(),
                    note: None,
                    occurred_at: Utc::now(),
                }),
            ];
            for cmd in commands {
                let committed = d.execute::<Shipment>(tenant_id, id, cmd).unwrap();
                envelopes.extend(committed.iter().map(|e| e.to_envelope()));
            }
        }

        group.throughput(Throughput::Elements(envelopes.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("rebuild_shipments", shipments),
            &envelopes,
            |b, envs| {
                let models = ReadModels::new();
                b.iter(|| black_box(models.rebuild(envs.iter().cloned()).unwrap()));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_dispatch_latency, bench_projection_rebuild);
criterion_main!(benches);
