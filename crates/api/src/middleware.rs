use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use cargohub_core::TenantId;

use crate::app::errors;
use crate::context::TenantContext;

pub const TENANT_HEADER: &str = "x-tenant-id";

/// Resolve the tenant from `X-Tenant-Id` and attach a [`TenantContext`].
pub async fn tenant_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let tenant_id = match extract_tenant(req.headers()) {
        Ok(t) => t,
        Err(msg) => return errors::json_error(StatusCode::BAD_REQUEST, "missing_tenant", msg),
    };

    req.extensions_mut().insert(TenantContext::new(tenant_id));
    next.run(req).await
}

fn extract_tenant(headers: &HeaderMap) -> Result<TenantId, &'static str> {
    let header = headers
        .get(TENANT_HEADER)
        .ok_or("X-Tenant-Id header is required")?;

    let raw = header
        .to_str()
        .map_err(|_| "X-Tenant-Id header is not valid text")?
        .trim();

    raw.parse().map_err(|_| "X-Tenant-Id must be a UUID")
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn tenant_header_must_be_a_uuid() {
        let mut headers = HeaderMap::new();
        assert!(extract_tenant(&headers).is_err());

        headers.insert(TENANT_HEADER, HeaderValue::from_static("acme"));
        assert!(extract_tenant(&headers).is_err());

        let tenant = TenantId::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_str(&tenant.to_string()).unwrap());
        assert_eq!(extract_tenant(&headers), Ok(tenant));
    }
}
