use axum::{Router, routing::get};

pub mod customers;
pub mod customs;
pub mod delivery_routes;
pub mod drivers;
pub mod events;
pub mod invoices;
pub mod notifications;
pub mod shipments;
pub mod system;
pub mod tickets;
pub mod warehouses;

/// Router for all tenant-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/stream", get(system::stream))
        .nest("/events", events::router())
        .nest("/customers", customers::router())
        .nest("/warehouses", warehouses::router())
        .nest("/shipments", shipments::router())
        .nest("/invoices", invoices::router())
        .nest("/customs", customs::router())
        .nest("/tickets", tickets::router())
        .nest("/notifications", notifications::router())
        .nest("/drivers", drivers::router())
        .nest("/routes", delivery_routes::router())
}
