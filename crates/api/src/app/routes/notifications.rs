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
use cargohub_customers::CustomerId;
use cargohub_notifications::{
    MarkNotificationRead, Notification, NotificationCommand, NotificationId, SendNotification,
};
use cargohub_shipments::ShipmentId;

use crate::app::dto;
use crate::app::errors::{self, ApiResult, JsonBody};
use crate::app::services::AppServices;
use crate::context::TenantContext;

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    pub customer_id: Option<String>,
    pub unread: Option<String>,
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(send_notification).get(list_notifications))
        .route("/:id", get(get_notification))
        .route("/:id/read", post(mark_read))
}

fn parse_flag(raw: Option<&str>) -> Result<bool, axum::response::Response> {
    match raw.map(str::trim) {
        None | Some("") | Some("false") | Some("0") => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some(other) => Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            format!("unread must be true or false, got '{other}'"),
        )),
    }
}

pub async fn send_notification(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    JsonBody(body): JsonBody<dto::SendNotificationRequest>,
) -> ApiResult {
    let tenant_id = tenant.tenant_id();
    let customer_id = CustomerId::new(errors::parse_id(&body.customer_id, "customer")?);
    let shipment_id =
        errors::parse_optional_id(body.shipment_id.as_deref(), "shipment")?.map(ShipmentId::new);
    if services
        .read_models()
        .customers
        .get(tenant_id, customer_id.0)
        .is_none()
    {
        return Err(errors::precondition(format!("customer {customer_id} is unknown")));
    }

    let agg = AggregateId::new();
    let cmd = NotificationCommand::SendNotification(SendNotification {
        tenant_id,
        notification_id: NotificationId::new(agg),
        customer_id,
        channel: body.channel,
        kind: body.kind,
        title: body.title,
        message: body.message,
        shipment_id,
        occurred_at: Utc::now(),
    });
    let committed = services
        .dispatch::<Notification>(tenant_id, agg, cmd)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::committed(StatusCode::CREATED, agg, &committed))
}

pub async fn mark_read(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "notification")?;
    let cmd = NotificationCommand::MarkNotificationRead(MarkNotificationRead {
        tenant_id: tenant.tenant_id(),
        notification_id: NotificationId::new(agg),
        occurred_at: Utc::now(),
    });
    let committed = services
        .dispatch::<Notification>(tenant.tenant_id(), agg, cmd)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::committed(StatusCode::OK, agg, &committed))
}

pub async fn get_notification(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let agg = errors::parse_id(&id, "notification")?;
    let notification = services
        .read_models()
        .notifications
        .get(tenant.tenant_id(), agg)
        .ok_or_else(|| errors::not_found("notification"))?;
    Ok(dto::one(dto::notification_to_json(notification)))
}

/// GET /notifications?customer_id=...&unread=true
pub async fn list_notifications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<InboxQuery>,
) -> ApiResult {
    let customer_id =
        errors::parse_optional_id(query.customer_id.as_deref(), "customer")?.map(CustomerId::new);
    let unread_only = parse_flag(query.unread.as_deref())?;
    let items = services
        .read_models()
        .notifications
        .inbox(tenant.tenant_id(), customer_id, unread_only)
        .into_iter()
        .map(dto::notification_to_json)
        .collect();
    Ok(dto::items(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unread_flag_accepts_booleans_only() {
        assert!(!parse_flag(None).unwrap());
        assert!(parse_flag(Some("true")).unwrap());
        assert!(!parse_flag(Some("0")).unwrap());
        assert!(parse_flag(Some("yes")).is_err());
    }
}
