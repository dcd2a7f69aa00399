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
use cargohub_shipments::ShipmentId;
use cargohub_support::{
    AssignTicket, ChangeTicketPriority, CloseTicket, OpenTicket, ReplyToTicket, ResolveTicket,
    SupportTicket, TicketCommand, TicketId,
};

use crate::app::dto;
use crate::app::errors::{self, ApiResult, JsonBody};
use crate::app::services::AppServices;
use crate::context::TenantContext;

#[derive(Debug, Deserialize)]
pub struct TicketListQuery {
    pub status: Option<String>,
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(open_ticket).get(list_tickets))
        .route("/:id", get(get_ticket))
        .route("/:id/assign", post(assign_ticket))
        .route("/:id/reply", post(reply_to_ticket))
        .route("/:id/priority", post(change_priority))
        .route("/:id/resolve", post(resolve_ticket))
        .route("/:id/close", post(close_ticket))
}

fn run(
    services: &AppServices,
    tenant_id: TenantId,
    agg: AggregateId,
    status: StatusCode,
    cmd: TicketCommand,
) -> ApiResult {
    let committed = services
        .dispatch::<SupportTicket>(tenant_id, agg, cmd)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::committed(status, agg, &committed))
}

pub async fn open_ticket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    JsonBody(body): JsonBody<dto::OpenTicketRequest>,
) -> ApiResult {
    let tenant_id = tenant.tenant_id();
    let customer_id = CustomerId::new(errors::parse_id(&body.customer_id, "customer")?);
    let shipment_id =
        errors::parse_optional_id(body.shipment_id.as_deref(), "shipment")?.map(ShipmentId::new);

    let views = services.read_models();
    if views.customers.get(tenant_id, customer_id.0).is_none() {
        return Err(errors::precondition(format!("customer {customer_id} is unknown")));
    }
    if let Some(shipment_id) = shipment_id {
        if views.shipments.get(tenant_id, shipment_id.0).is_none() {
            return Err(errors::precondition(format!("shipment {shipment_id} is unknown")));
        }
    }

    let agg = AggregateId::new();
    let cmd = TicketCommand::OpenTicket(OpenTicket {
        tenant_id,
        ticket_id: TicketId::new(agg),
        customer_id,
        shipment_id,
        subject: body.subject,
        description: body.description,
        priority: body.priority,
        occurred_at: Utc::now(),
    });
    run(&services, tenant_id, agg, StatusCode::CREATED, cmd)
}

pub async fn assign_ticket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::AssignTicketRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "ticket")?;
    let cmd = TicketCommand::AssignTicket(AssignTicket {
        tenant_id: tenant.tenant_id(),
        ticket_id: TicketId::new(agg),
        assignee: body.assignee,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn reply_to_ticket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::ReplyToTicketRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "ticket")?;
    let cmd = TicketCommand::ReplyToTicket(ReplyToTicket {
        tenant_id: tenant.tenant_id(),
        ticket_id: TicketId::new(agg),
        author: body.author,
        author_name: body.author_name,
        body: body.body,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn change_priority(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::ChangePriorityRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "ticket")?;
    let cmd = TicketCommand::ChangeTicketPriority(ChangeTicketPriority {
        tenant_id: tenant.tenant_id(),
        ticket_id: TicketId::new(agg),
        priority: body.priority,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn resolve_ticket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::ResolveTicketRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "ticket")?;
    let cmd = TicketCommand::ResolveTicket(ResolveTicket {
        tenant_id: tenant.tenant_id(),
        ticket_id: TicketId::new(agg),
        resolution: body.resolution,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn close_ticket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "ticket")?;
    let cmd = TicketCommand::CloseTicket(CloseTicket {
        tenant_id: tenant.tenant_id(),
        ticket_id: TicketId::new(agg),
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn get_ticket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "ticket")?;
    let ticket = services
        .read_models()
        .tickets
        .get(tenant.tenant_id(), agg)
        .ok_or_else(|| errors::not_found("ticket"))?;
    Ok(dto::one(dto::ticket_to_json(ticket)))
}

/// GET /tickets?status=open
pub async fn list_tickets(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<TicketListQuery>,
) -> ApiResult {
    let status = errors::parse_optional_enum(query.status.as_deref(), "status")?;
    let items = services
        .read_models()
        .tickets
        .queue(tenant.tenant_id(), status)
        .into_iter()
        .map(dto::ticket_to_json)
        .collect();
    Ok(dto::items(items))
}
