//! Read-only access to the raw event log for auditing and debugging.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use cargohub_infra::event_store::{EventFilter, Pagination};

use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;
use crate::context::TenantContext;

#[derive(Debug, Deserialize)]
pub struct EventListQuery {
    pub aggregate_id: Option<String>,
    pub aggregate_type: Option<String>,
    pub event_type: Option<String>,
    pub occurred_after: Option<DateTime<Utc>>,
    pub occurred_before: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_events))
        .route("/:aggregate_id", get(get_aggregate_events))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, axum::response::Response> {
    query
        .map(|Query(q)| q)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.body_text()))
}

/// GET /events?aggregate_type=shipments.shipment&limit=50&offset=0
///
/// Newest first across every stream of the tenant.
pub async fn list_events(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    query: Result<Query<EventListQuery>, QueryRejection>,
) -> ApiResult {
    let query = query_params(query)?;
    let filter = EventFilter {
        aggregate_id: errors::parse_optional_id(query.aggregate_id.as_deref(), "aggregate")?,
        aggregate_type: query.aggregate_type,
        event_type: query.event_type,
        occurred_after: query.occurred_after,
        occurred_before: query.occurred_before,
    };
    let pagination = Pagination::new(query.limit, query.offset);

    let result = services
        .query()
        .query_events(tenant.tenant_id(), filter, pagination)
        .await
        .map_err(errors::store_error)?;
    Ok((StatusCode::OK, Json(result)).into_response())
}

/// GET /events/:aggregate_id
///
/// One stream in sequence order. An unknown stream is an empty page.
pub async fn get_aggregate_events(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(aggregate_id): Path<String>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult {
    let aggregate_id = errors::parse_id(&aggregate_id, "aggregate")?;
    let page = query_params(query)?;

    let result = services
        .query()
        .get_aggregate_events(
            tenant.tenant_id(),
            aggregate_id,
            Some(Pagination::new(page.limit, page.offset)),
        )
        .await
        .map_err(errors::store_error)?;
    Ok((StatusCode::OK, Json(result)).into_response())
}
