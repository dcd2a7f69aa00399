use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use serde::Deserialize;

use cargohub_core::{AggregateId, TenantId};
use cargohub_customers::CustomerId;
use cargohub_infra::projections::InvoiceFilter;
use cargohub_invoicing::{
    Invoice, InvoiceCommand, InvoiceId, IssueInvoice, RegisterPayment, VoidInvoice, compute_totals,
};
use cargohub_shipments::ShipmentId;

use crate::app::dto;
use crate::app::errors::{self, ApiResult, JsonBody};
use crate::app::services::AppServices;
use crate::context::TenantContext;

#[derive(Debug, Deserialize)]
pub struct InvoiceListQuery {
    pub status: Option<String>,
    pub customer_id: Option<String>,
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(issue_invoice).get(list_invoices))
        .route("/preview", post(preview_invoice))
        .route("/:id", get(get_invoice))
        .route("/:id/payments", post(register_payment))
        .route("/:id/void", post(void_invoice))
}

fn run(
    services: &AppServices,
    tenant_id: TenantId,
    agg: AggregateId,
    status: StatusCode,
    cmd: InvoiceCommand,
) -> ApiResult {
    let committed = services
        .dispatch::<Invoice>(tenant_id, agg, cmd)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::committed(status, agg, &committed))
}

/// POST /invoices
///
/// Without `due_date` the invoice falls due after the configured payment terms.
pub async fn issue_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    JsonBody(body): JsonBody<dto::IssueInvoiceRequest>,
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
        let billed_to = views
            .shipments
            .get(tenant_id, shipment_id.0)
            .and_then(|s| s.customer_id());
        if billed_to != Some(customer_id) {
            return Err(errors::precondition(format!(
                "shipment {shipment_id} does not belong to customer {customer_id}"
            )));
        }
    }

    let now = Utc::now();
    let due_date = body
        .due_date
        .unwrap_or_else(|| now + Duration::days(services.config().invoice_payment_terms_days));

    let agg = AggregateId::new();
    let cmd = InvoiceCommand::IssueInvoice(IssueInvoice {
        tenant_id,
        invoice_id: InvoiceId::new(agg),
        customer_id,
        shipment_id,
        currency: body.currency,
        lines: body.lines,
        due_date,
        occurred_at: now,
    });
    run(&services, tenant_id, agg, StatusCode::CREATED, cmd)
}

/// POST /invoices/preview
///
/// Totals for a set of lines. Nothing is stored.
pub async fn preview_invoice(JsonBody(body): JsonBody<dto::PreviewInvoiceRequest>) -> ApiResult {
    let totals = compute_totals(&body.lines).map_err(errors::domain_error_to_response)?;
    let value = serde_json::to_value(totals).map_err(|e| {
        errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "serialize_error", e.to_string())
    })?;
    Ok(dto::one(value))
}

pub async fn register_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::RegisterPaymentRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "invoice")?;
    let cmd = InvoiceCommand::RegisterPayment(RegisterPayment {
        tenant_id: tenant.tenant_id(),
        invoice_id: InvoiceId::new(agg),
        amount: body.amount,
        reference: body.reference,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn void_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::VoidInvoiceRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "invoice")?;
    let cmd = InvoiceCommand::VoidInvoice(VoidInvoice {
        tenant_id: tenant.tenant_id(),
        invoice_id: InvoiceId::new(agg),
        reason: body.reason,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn get_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "invoice")?;
    let invoice = services
        .read_models()
        .invoices
        .get(tenant.tenant_id(), agg)
        .ok_or_else(|| errors::not_found("invoice"))?;
    Ok(dto::one(dto::invoice_to_json(invoice, Utc::now())))
}

/// GET /invoices?status=open&customer_id=...
pub async fn list_invoices(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<InvoiceListQuery>,
) -> ApiResult {
    let filter = InvoiceFilter {
        status: errors::parse_optional_enum(query.status.as_deref(), "status")?,
        customer_id: errors::parse_optional_id(query.customer_id.as_deref(), "customer")?
            .map(CustomerId::new),
    };
    let now = Utc::now();
    let items = services
        .read_models()
        .invoices
        .search(tenant.tenant_id(), filter)
        .into_iter()
        .map(|inv| dto::invoice_to_json(inv, now))
        .collect();
    Ok(dto::items(items))
}
