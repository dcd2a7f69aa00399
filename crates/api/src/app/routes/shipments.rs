use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;

use cargohub_core::{AggregateId, TenantId};
use cargohub_customers::CustomerId;
use cargohub_infra::projections::ShipmentFilter;
use cargohub_shipments::{
    CancelShipment, CreateShipment, ReturnShipment, Shipment, ShipmentCommand, ShipmentId,
    ShipmentStatus, UpdateShipmentStatus,
};
use cargohub_warehouses::WarehouseId;

use crate::app::dto;
use crate::app::errors::{self, ApiResult, JsonBody};
use crate::app::services::AppServices;
use crate::context::TenantContext;

#[derive(Debug, Deserialize)]
pub struct ShipmentListQuery {
    pub status: Option<String>,
    pub customer_id: Option<String>,
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_shipment).get(list_shipments))
        .route("/track/:tracking_number", get(track_shipment))
        .route("/:id", get(get_shipment))
        .route("/:id/status", post(update_status))
        .route("/:id/cancel", post(cancel_shipment))
        .route("/:id/return", post(return_shipment))
}

fn run(
    services: &AppServices,
    tenant_id: TenantId,
    agg: AggregateId,
    status: StatusCode,
    cmd: ShipmentCommand,
) -> ApiResult {
    let committed = services
        .dispatch::<Shipment>(tenant_id, agg, cmd)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::committed(status, agg, &committed))
}

/// POST /shipments
///
/// The customer must be able to ship and both warehouses must be active.
pub async fn create_shipment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    JsonBody(body): JsonBody<dto::CreateShipmentRequest>,
) -> ApiResult {
    let tenant_id = tenant.tenant_id();
    let customer_id = CustomerId::new(errors::parse_id(&body.customer_id, "customer")?);
    let origin = WarehouseId::new(errors::parse_id(&body.origin_warehouse_id, "warehouse")?);
    let destination =
        WarehouseId::new(errors::parse_id(&body.destination_warehouse_id, "warehouse")?);

    let views = services.read_models();
    if !views.customers.can_ship(tenant_id, customer_id) {
        return Err(errors::precondition(format!(
            "customer {customer_id} is unknown or suspended"
        )));
    }
    for warehouse in [origin, destination] {
        if !views.warehouses.is_active(tenant_id, warehouse) {
            return Err(errors::precondition(format!(
                "warehouse {warehouse} is unknown or inactive"
            )));
        }
    }

    let agg = AggregateId::new();
    let cmd = ShipmentCommand::CreateShipment(CreateShipment {
        tenant_id,
        shipment_id: ShipmentId::new(agg),
        customer_id,
        origin_warehouse_id: origin,
        destination_warehouse_id: destination,
        origin_location: views.warehouses.location_label(tenant_id, origin),
        recipient_name: body.recipient_name,
        delivery_address: body.delivery_address,
        weight_grams: body.weight_grams,
        declared_value: body.declared_value,
        description: body.description,
        occurred_at: Utc::now(),
    });
    run(&services, tenant_id, agg, StatusCode::CREATED, cmd)
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::UpdateShipmentStatusRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "shipment")?;
    let status = ShipmentStatus::parse(&body.status).map_err(errors::domain_error_to_response)?;
    let cmd = ShipmentCommand::UpdateShipmentStatus(UpdateShipmentStatus {
        tenant_id: tenant.tenant_id(),
        shipment_id: ShipmentId::new(agg),
        status,
        location: body.location,
        note: body.note,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn cancel_shipment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::CancelShipmentRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "shipment")?;
    let cmd = ShipmentCommand::CancelShipment(CancelShipment {
        tenant_id: tenant.tenant_id(),
        shipment_id: ShipmentId::new(agg),
        reason: body.reason,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn return_shipment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::ReturnShipmentRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "shipment")?;
    let cmd = ShipmentCommand::ReturnShipment(ReturnShipment {
        tenant_id: tenant.tenant_id(),
        shipment_id: ShipmentId::new(agg),
        reason: body.reason,
        location: body.location,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn get_shipment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "shipment")?;
    let shipment = services
        .read_models()
        .shipments
        .get(tenant.tenant_id(), agg)
        .ok_or_else(|| errors::not_found("shipment"))?;
    Ok(dto::one(dto::shipment_to_json(shipment)))
}

/// GET /shipments/track/:tracking_number
pub async fn track_shipment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(tracking_number): Path<String>,
) -> ApiResult {
    let shipment = services
        .read_models()
        .shipments
        .by_tracking_number(tenant.tenant_id(), &tracking_number)
        .ok_or_else(|| errors::not_found("tracking number"))?;
    Ok(dto::one(dto::tracking_to_json(shipment)))
}

/// GET /shipments?status=in_transit&customer_id=...
pub async fn list_shipments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<ShipmentListQuery>,
) -> ApiResult {
    let filter = ShipmentFilter {
        status: errors::parse_optional_enum(query.status.as_deref(), "status")?,
        customer_id: errors::parse_optional_id(query.customer_id.as_deref(), "customer")?
            .map(CustomerId::new),
    };
    let items = services
        .read_models()
        .shipments
        .search(tenant.tenant_id(), filter)
        .into_iter()
        .map(dto::shipment_to_json)
        .collect();
    Ok(dto::items(items))
}
