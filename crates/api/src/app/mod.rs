//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: event store, bus, projections, dispatcher and the background subscriber
//! - `routes/`: HTTP handlers, one file per domain area
//! - `dto.rs`: request bodies and JSON views
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use cargohub_infra::config::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router.
pub async fn build_app(config: AppConfig) -> anyhow::Result<Router> {
    let (router, _services) = build_app_with_services(config).await?;
    Ok(router)
}

/// Like [`build_app`], also handing back the services for shutdown.
pub async fn build_app_with_services(
    config: AppConfig,
) -> anyhow::Result<(Router, Arc<services::AppServices>)> {
    let services = Arc::new(services::build_services(config).await?);

    // Tenant-scoped routes.
    let scoped = routes::router()
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn(middleware::tenant_middleware));

    let router = Router::new()
        .route("/health", get(routes::system::health))
        .merge(scoped)
        .layer(ServiceBuilder::new());

    Ok((router, services))
}
