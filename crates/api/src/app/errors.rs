use axum::{
    Json,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::json;

use cargohub_core::{AggregateId, DomainError};
use cargohub_infra::command_dispatcher::DispatchError;
use cargohub_infra::event_store::EventStoreError;

/// Handlers return the error response on the `Err` side so `?` works.
pub type ApiResult = Result<Response, Response>;

pub fn dispatch_error_to_response(err: DispatchError) -> Response {
    match err {
        DispatchError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DispatchError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DispatchError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DispatchError::Unauthorized => json_error(StatusCode::FORBIDDEN, "unauthorized", "unauthorized"),
        DispatchError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DispatchError::Deserialize(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "deserialize_error", msg)
        }
        DispatchError::Store(e) => store_error(e),
        DispatchError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
        DispatchError::TenantIsolation(msg) => json_error(StatusCode::FORBIDDEN, "tenant_isolation", msg),
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    dispatch_error_to_response(DispatchError::from(err))
}

pub fn store_error(err: EventStoreError) -> Response {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "store_error",
        format!("{err:?}"),
    )
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn not_found(what: &str) -> Response {
    json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
}

/// A cross-record precondition checked against the read models.
pub fn precondition(message: impl Into<String>) -> Response {
    json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", message)
}

/// Parse a path or body id, answering `400 invalid_id` on garbage.
pub fn parse_id(raw: &str, what: &str) -> Result<AggregateId, Response> {
    raw.trim().parse().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("invalid {what} id"),
        )
    })
}

pub fn parse_optional_id(raw: Option<&str>, what: &str) -> Result<Option<AggregateId>, Response> {
    raw.map(|r| parse_id(r, what)).transpose()
}

/// Parse a query-string value into one of the serde-named enums.
pub fn parse_enum<T: DeserializeOwned>(raw: &str, field: &str) -> Result<T, Response> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_lowercase())).map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            format!("unknown {field} '{raw}'"),
        )
    })
}

pub fn parse_optional_enum<T: DeserializeOwned>(
    raw: Option<&str>,
    field: &str,
) -> Result<Option<T>, Response> {
    raw.filter(|r| !r.trim().is_empty())
        .map(|r| parse_enum(r, field))
        .transpose()
}

/// `Json<T>` whose rejections are JSON error bodies.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                rejection.body_text(),
            )),
        }
    }
}
