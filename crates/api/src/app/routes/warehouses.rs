use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;

use cargohub_core::{AggregateId, TenantId};
use cargohub_warehouses::{
    ActivateWarehouse, DeactivateWarehouse, RegisterWarehouse, UpdateWarehouse, Warehouse,
    WarehouseCommand, WarehouseId,
};

use crate::app::dto;
use crate::app::errors::{self, ApiResult, JsonBody};
use crate::app::services::AppServices;
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_warehouse).get(list_warehouses))
        .route("/:id", get(get_warehouse).patch(update_warehouse))
        .route("/:id/activate", post(activate_warehouse))
        .route("/:id/deactivate", post(deactivate_warehouse))
}

fn run(
    services: &AppServices,
    tenant_id: TenantId,
    agg: AggregateId,
    status: StatusCode,
    cmd: WarehouseCommand,
) -> ApiResult {
    let committed = services
        .dispatch::<Warehouse>(tenant_id, agg, cmd)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::committed(status, agg, &committed))
}

pub async fn register_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    JsonBody(body): JsonBody<dto::RegisterWarehouseRequest>,
) -> ApiResult {
    let agg = AggregateId::new();
    let cmd = WarehouseCommand::RegisterWarehouse(RegisterWarehouse {
        tenant_id: tenant.tenant_id(),
        warehouse_id: WarehouseId::new(agg),
        code: body.code,
        name: body.name,
        address: body.address,
        capacity: body.capacity,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::CREATED, cmd)
}

pub async fn update_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::UpdateWarehouseRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "warehouse")?;
    let cmd = WarehouseCommand::UpdateWarehouse(UpdateWarehouse {
        tenant_id: tenant.tenant_id(),
        warehouse_id: WarehouseId::new(agg),
        name: body.name,
        address: body.address,
        capacity: body.capacity,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn activate_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "warehouse")?;
    let cmd = WarehouseCommand::ActivateWarehouse(ActivateWarehouse {
        tenant_id: tenant.tenant_id(),
        warehouse_id: WarehouseId::new(agg),
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn deactivate_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "warehouse")?;
    let cmd = WarehouseCommand::DeactivateWarehouse(DeactivateWarehouse {
        tenant_id: tenant.tenant_id(),
        warehouse_id: WarehouseId::new(agg),
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn get_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "warehouse")?;
    let warehouse = services
        .read_models()
        .warehouses
        .get(tenant.tenant_id(), agg)
        .ok_or_else(|| errors::not_found("warehouse"))?;
    Ok(dto::one(dto::warehouse_to_json(warehouse)))
}

pub async fn list_warehouses(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> ApiResult {
    let items = services
        .read_models()
        .warehouses
        .by_code(tenant.tenant_id())
        .into_iter()
        .map(dto::warehouse_to_json)
        .collect();
    Ok(dto::items(items))
}
