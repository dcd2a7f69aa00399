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
use cargohub_routing::{
    Driver, DriverCommand, DriverId, RegisterDriver, SetDriverStatus, UpdateDriver,
};

use crate::app::dto;
use crate::app::errors::{self, ApiResult, JsonBody};
use crate::app::services::AppServices;
use crate::context::TenantContext;

#[derive(Debug, Deserialize)]
pub struct RosterQuery {
    pub status: Option<String>,
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_driver).get(list_drivers))
        .route("/:id", get(get_driver).patch(update_driver))
        .route("/:id/status", post(set_status))
}

fn run(
    services: &AppServices,
    tenant_id: TenantId,
    agg: AggregateId,
    status: StatusCode,
    cmd: DriverCommand,
) -> ApiResult {
    let committed = services
        .dispatch::<Driver>(tenant_id, agg, cmd)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::committed(status, agg, &committed))
}

pub async fn register_driver(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    JsonBody(body): JsonBody<dto::RegisterDriverRequest>,
) -> ApiResult {
    let agg = AggregateId::new();
    let cmd = DriverCommand::RegisterDriver(RegisterDriver {
        tenant_id: tenant.tenant_id(),
        driver_id: DriverId::new(agg),
        name: body.name,
        phone: body.phone,
        license_number: body.license_number,
        vehicle_plate: body.vehicle_plate,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::CREATED, cmd)
}

pub async fn update_driver(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::UpdateDriverRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "driver")?;
    let cmd = DriverCommand::UpdateDriver(UpdateDriver {
        tenant_id: tenant.tenant_id(),
        driver_id: DriverId::new(agg),
        name: body.name,
        phone: body.phone,
        vehicle_plate: body.vehicle_plate,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn set_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::DriverStatusRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "driver")?;
    let cmd = DriverCommand::SetDriverStatus(SetDriverStatus {
        tenant_id: tenant.tenant_id(),
        driver_id: DriverId::new(agg),
        status: body.status,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn get_driver(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "driver")?;
    let driver = services
        .read_models()
        .drivers
        .get(tenant.tenant_id(), agg)
        .ok_or_else(|| errors::not_found("driver"))?;
    Ok(dto::one(dto::driver_to_json(driver)))
}

/// GET /drivers?status=available
pub async fn list_drivers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<RosterQuery>,
) -> ApiResult {
    let status = errors::parse_optional_enum(query.status.as_deref(), "status")?;
    let items = services
        .read_models()
        .drivers
        .roster(tenant.tenant_id(), status)
        .into_iter()
        .map(dto::driver_to_json)
        .collect();
    Ok(dto::items(items))
}
