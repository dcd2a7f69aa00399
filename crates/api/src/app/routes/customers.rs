use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;

use cargohub_core::AggregateId;
use cargohub_customers::{
    Customer, CustomerCommand, CustomerId, CustomerStatus, ReactivateCustomer, RegisterCustomer,
    SuspendCustomer, UpdateCustomer,
};

use crate::app::dto;
use crate::app::errors::{self, ApiResult, JsonBody};
use crate::app::services::AppServices;
use crate::context::TenantContext;

#[derive(Debug, Deserialize)]
pub struct CustomerListQuery {
    pub status: Option<String>,
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_customer).get(list_customers))
        .route("/:id", get(get_customer).patch(update_customer))
        .route("/:id/suspend", post(suspend_customer))
        .route("/:id/reactivate", post(reactivate_customer))
}

pub async fn register_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    JsonBody(body): JsonBody<dto::RegisterCustomerRequest>,
) -> ApiResult {
    let agg = AggregateId::new();
    let cmd = CustomerCommand::RegisterCustomer(RegisterCustomer {
        tenant_id: tenant.tenant_id(),
        customer_id: CustomerId::new(agg),
        name: body.name,
        email: body.email,
        phone: body.phone,
        company: body.company,
        address: body.address,
        occurred_at: Utc::now(),
    });

    let committed = services
        .dispatch::<Customer>(tenant.tenant_id(), agg, cmd)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::committed(StatusCode::CREATED, agg, &committed))
}

pub async fn update_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::UpdateCustomerRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "customer")?;
    let cmd = CustomerCommand::UpdateCustomer(UpdateCustomer {
        tenant_id: tenant.tenant_id(),
        customer_id: CustomerId::new(agg),
        name: body.name,
        email: body.email,
        phone: body.phone,
        company: body.company,
        address: body.address,
        occurred_at: Utc::now(),
    });

    let committed = services
        .dispatch::<Customer>(tenant.tenant_id(), agg, cmd)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::committed(StatusCode::OK, agg, &committed))
}

pub async fn suspend_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::SuspendCustomerRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "customer")?;
    let cmd = CustomerCommand::SuspendCustomer(SuspendCustomer {
        tenant_id: tenant.tenant_id(),
        customer_id: CustomerId::new(agg),
        reason: body.reason,
        occurred_at: Utc::now(),
    });

    let committed = services
        .dispatch::<Customer>(tenant.tenant_id(), agg, cmd)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::committed(StatusCode::OK, agg, &committed))
}

pub async fn reactivate_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "customer")?;
    let cmd = CustomerCommand::ReactivateCustomer(ReactivateCustomer {
        tenant_id: tenant.tenant_id(),
        customer_id: CustomerId::new(agg),
        occurred_at: Utc::now(),
    });

    let committed = services
        .dispatch::<Customer>(tenant.tenant_id(), agg, cmd)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::committed(StatusCode::OK, agg, &committed))
}

pub async fn get_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "customer")?;
    let customer = services
        .read_models()
        .customers
        .get(tenant.tenant_id(), agg)
        .ok_or_else(|| errors::not_found("customer"))?;
    Ok(dto::one(dto::customer_to_json(customer)))
}

/// GET /customers?status=active
pub async fn list_customers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<CustomerListQuery>,
) -> ApiResult {
    let status: Option<CustomerStatus> =
        errors::parse_optional_enum(query.status.as_deref(), "status")?;
    let items = services
        .read_models()
        .customers
        .directory(tenant.tenant_id(), status)
        .into_iter()
        .map(dto::customer_to_json)
        .collect();
    Ok(dto::items(items))
}
