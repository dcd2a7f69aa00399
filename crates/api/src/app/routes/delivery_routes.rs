//! Delivery routes: planning, stop sequencing and driving them.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{delete, get, post},
};
use chrono::Utc;
use serde::Deserialize;

use cargohub_core::{AggregateId, TenantId};
use cargohub_infra::projections::ReadModels;
use cargohub_routing::{
    AddStop, AssignDriver, CompleteStop, DeliveryRoute, DriverId, FailStop, PlanRoute, RemoveStop,
    ReorderStops, RouteCommand, RouteId, StartRoute, StopInput,
};
use cargohub_shipments::ShipmentId;

use crate::app::dto;
use crate::app::errors::{self, ApiResult, JsonBody};
use crate::app::services::AppServices;
use crate::context::TenantContext;

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub status: Option<String>,
    pub driver_id: Option<String>,
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(plan_route).get(list_routes))
        .route("/:id", get(get_route))
        .route("/:id/stops", post(add_stop).put(reorder_stops))
        .route("/:id/stops/:shipment_id", delete(remove_stop))
        .route("/:id/stops/:shipment_id/complete", post(complete_stop))
        .route("/:id/stops/:shipment_id/fail", post(fail_stop))
        .route("/:id/driver", post(assign_driver))
        .route("/:id/start", post(start_route))
}

fn run(
    services: &AppServices,
    tenant_id: TenantId,
    agg: AggregateId,
    status: StatusCode,
    cmd: RouteCommand,
) -> ApiResult {
    let committed = services
        .dispatch::<DeliveryRoute>(tenant_id, agg, cmd)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::committed(status, agg, &committed))
}

/// Resolve a requested stop; without an address the shipment's own is used.
fn stop_input(
    views: &ReadModels,
    tenant_id: TenantId,
    stop: dto::StopRequest,
) -> Result<StopInput, Response> {
    let shipment_id = ShipmentId::new(errors::parse_id(&stop.shipment_id, "shipment")?);
    let address = match stop.address {
        Some(address) => address,
        None => views
            .shipments
            .get(tenant_id, shipment_id.0)
            .and_then(|s| s.delivery_address().cloned())
            .ok_or_else(|| {
                errors::precondition(format!(
                    "shipment {shipment_id} is unknown; give the stop an address"
                ))
            })?,
    };
    Ok(StopInput {
        shipment_id,
        address,
    })
}

fn available_driver(views: &ReadModels, tenant_id: TenantId, raw: &str) -> Result<DriverId, Response> {
    let driver_id = DriverId::new(errors::parse_id(raw, "driver")?);
    if !views.drivers.is_available(tenant_id, driver_id) {
        return Err(errors::precondition(format!(
            "driver {driver_id} is unknown or not available"
        )));
    }
    Ok(driver_id)
}

/// POST /routes
pub async fn plan_route(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    JsonBody(body): JsonBody<dto::PlanRouteRequest>,
) -> ApiResult {
    let tenant_id = tenant.tenant_id();
    let views = services.read_models();
    let driver_id = body
        .driver_id
        .as_deref()
        .map(|raw| available_driver(views, tenant_id, raw))
        .transpose()?;
    let stops = body
        .stops
        .into_iter()
        .map(|s| stop_input(views, tenant_id, s))
        .collect::<Result<Vec<_>, _>>()?;

    let agg = AggregateId::new();
    let cmd = RouteCommand::PlanRoute(PlanRoute {
        tenant_id,
        route_id: RouteId::new(agg),
        scheduled_date: body.scheduled_date,
        driver_id,
        stops,
        occurred_at: Utc::now(),
    });
    run(&services, tenant_id, agg, StatusCode::CREATED, cmd)
}

/// POST /routes/:id/stops appends one stop.
pub async fn add_stop(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::StopRequest>,
) -> ApiResult {
    let tenant_id = tenant.tenant_id();
    let agg = errors::parse_id(&id, "route")?;
    let stop = stop_input(services.read_models(), tenant_id, body)?;
    let cmd = RouteCommand::AddStop(AddStop {
        tenant_id,
        route_id: RouteId::new(agg),
        stop,
        occurred_at: Utc::now(),
    });
    run(&services, tenant_id, agg, StatusCode::OK, cmd)
}

pub async fn remove_stop(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path((id, shipment_id)): Path<(String, String)>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "route")?;
    let shipment_id = ShipmentId::new(errors::parse_id(&shipment_id, "shipment")?);
    let cmd = RouteCommand::RemoveStop(RemoveStop {
        tenant_id: tenant.tenant_id(),
        route_id: RouteId::new(agg),
        shipment_id,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

/// PUT /routes/:id/stops with the full new visiting order.
pub async fn reorder_stops(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::ReorderStopsRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "route")?;
    let order = body
        .order
        .iter()
        .map(|raw| errors::parse_id(raw, "shipment").map(ShipmentId::new))
        .collect::<Result<Vec<_>, _>>()?;
    let cmd = RouteCommand::ReorderStops(ReorderStops {
        tenant_id: tenant.tenant_id(),
        route_id: RouteId::new(agg),
        order,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn assign_driver(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::AssignDriverRequest>,
) -> ApiResult {
    let tenant_id = tenant.tenant_id();
    let agg = errors::parse_id(&id, "route")?;
    let driver_id = available_driver(services.read_models(), tenant_id, &body.driver_id)?;
    let cmd = RouteCommand::AssignDriver(AssignDriver {
        tenant_id,
        route_id: RouteId::new(agg),
        driver_id,
        occurred_at: Utc::now(),
    });
    run(&services, tenant_id, agg, StatusCode::OK, cmd)
}

pub async fn start_route(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "route")?;
    let cmd = RouteCommand::StartRoute(StartRoute {
        tenant_id: tenant.tenant_id(),
        route_id: RouteId::new(agg),
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn complete_stop(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path((id, shipment_id)): Path<(String, String)>,
    JsonBody(body): JsonBody<dto::CompleteStopRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "route")?;
    let shipment_id = ShipmentId::new(errors::parse_id(&shipment_id, "shipment")?);
    let cmd = RouteCommand::CompleteStop(CompleteStop {
        tenant_id: tenant.tenant_id(),
        route_id: RouteId::new(agg),
        shipment_id,
        note: body.note,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn fail_stop(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path((id, shipment_id)): Path<(String, String)>,
    JsonBody(body): JsonBody<dto::FailStopRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "route")?;
    let shipment_id = ShipmentId::new(errors::parse_id(&shipment_id, "shipment")?);
    let cmd = RouteCommand::FailStop(FailStop {
        tenant_id: tenant.tenant_id(),
        route_id: RouteId::new(agg),
        shipment_id,
        note: body.note,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn get_route(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "route")?;
    let route = services
        .read_models()
        .routes
        .get(tenant.tenant_id(), agg)
        .ok_or_else(|| errors::not_found("route"))?;
    Ok(dto::one(dto::route_to_json(route)))
}

/// GET /routes?status=planned or ?driver_id=...
pub async fn list_routes(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<ScheduleQuery>,
) -> ApiResult {
    let tenant_id = tenant.tenant_id();
    let views = services.read_models();
    let routes = match errors::parse_optional_id(query.driver_id.as_deref(), "driver")? {
        Some(driver) => views.routes.for_driver(tenant_id, DriverId::new(driver)),
        None => views.routes.schedule(
            tenant_id,
            errors::parse_optional_enum(query.status.as_deref(), "status")?,
        ),
    };
    Ok(dto::items(routes.into_iter().map(dto::route_to_json).collect()))
}
