use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post, put},
};
use chrono::Utc;
use serde::Deserialize;

use cargohub_core::{AggregateId, TenantId};
use cargohub_customs::{
    AmendDeclarationItems, ClearDeclaration, CustomsDeclaration, DeclarationCommand, DeclarationId,
    FileDeclaration, HoldDeclaration, RejectDeclaration, SubmitDeclaration,
};
use cargohub_shipments::ShipmentId;

use crate::app::dto;
use crate::app::errors::{self, ApiResult, JsonBody};
use crate::app::services::AppServices;
use crate::context::TenantContext;

#[derive(Debug, Deserialize)]
pub struct DeclarationListQuery {
    pub status: Option<String>,
    pub shipment_id: Option<String>,
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(file_declaration).get(list_declarations))
        .route("/:id", get(get_declaration))
        .route("/:id/items", put(amend_items))
        .route("/:id/submit", post(submit_declaration))
        .route("/:id/clear", post(clear_declaration))
        .route("/:id/hold", post(hold_declaration))
        .route("/:id/reject", post(reject_declaration))
}

fn run(
    services: &AppServices,
    tenant_id: TenantId,
    agg: AggregateId,
    status: StatusCode,
    cmd: DeclarationCommand,
) -> ApiResult {
    let committed = services
        .dispatch::<CustomsDeclaration>(tenant_id, agg, cmd)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::committed(status, agg, &committed))
}

pub async fn file_declaration(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    JsonBody(body): JsonBody<dto::FileDeclarationRequest>,
) -> ApiResult {
    let tenant_id = tenant.tenant_id();
    let shipment_id = ShipmentId::new(errors::parse_id(&body.shipment_id, "shipment")?);
    if services
        .read_models()
        .shipments
        .get(tenant_id, shipment_id.0)
        .is_none()
    {
        return Err(errors::precondition(format!("shipment {shipment_id} is unknown")));
    }

    let agg = AggregateId::new();
    let cmd = DeclarationCommand::FileDeclaration(FileDeclaration {
        tenant_id,
        declaration_id: DeclarationId::new(agg),
        shipment_id,
        exporter: body.exporter,
        importer: body.importer,
        destination_country: body.destination_country,
        items: body.items,
        occurred_at: Utc::now(),
    });
    run(&services, tenant_id, agg, StatusCode::CREATED, cmd)
}

pub async fn amend_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::AmendItemsRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "declaration")?;
    let cmd = DeclarationCommand::AmendDeclarationItems(AmendDeclarationItems {
        tenant_id: tenant.tenant_id(),
        declaration_id: DeclarationId::new(agg),
        items: body.items,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn submit_declaration(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "declaration")?;
    let cmd = DeclarationCommand::SubmitDeclaration(SubmitDeclaration {
        tenant_id: tenant.tenant_id(),
        declaration_id: DeclarationId::new(agg),
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn clear_declaration(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "declaration")?;
    let cmd = DeclarationCommand::ClearDeclaration(ClearDeclaration {
        tenant_id: tenant.tenant_id(),
        declaration_id: DeclarationId::new(agg),
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn hold_declaration(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::ReasonRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "declaration")?;
    let cmd = DeclarationCommand::HoldDeclaration(HoldDeclaration {
        tenant_id: tenant.tenant_id(),
        declaration_id: DeclarationId::new(agg),
        reason: body.reason,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn reject_declaration(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::ReasonRequest>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "declaration")?;
    let cmd = DeclarationCommand::RejectDeclaration(RejectDeclaration {
        tenant_id: tenant.tenant_id(),
        declaration_id: DeclarationId::new(agg),
        reason: body.reason,
        occurred_at: Utc::now(),
    });
    run(&services, tenant.tenant_id(), agg, StatusCode::OK, cmd)
}

pub async fn get_declaration(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "declaration")?;
    let declaration = services
        .read_models()
        .customs
        .get(tenant.tenant_id(), agg)
        .ok_or_else(|| errors::not_found("declaration"))?;
    Ok(dto::one(dto::declaration_to_json(declaration)))
}

/// GET /customs?status=held or ?shipment_id=...
pub async fn list_declarations(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<DeclarationListQuery>,
) -> ApiResult {
    let tenant_id = tenant.tenant_id();
    let views = services.read_models();
    let declarations = match errors::parse_optional_id(query.shipment_id.as_deref(), "shipment")? {
        Some(shipment) => views.customs.for_shipment(tenant_id, ShipmentId::new(shipment)),
        None => views.customs.declarations(
            tenant_id,
            errors::parse_optional_enum(query.status.as_deref(), "status")?,
        ),
    };
    Ok(dto::items(
        declarations.into_iter().map(dto::declaration_to_json).collect(),
    ))
}
