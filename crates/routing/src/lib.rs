//! Delivery routing domain module (event-sourced).
//!
//! Drivers, and the delivery routes they drive. A route visits its stops in
//! sequence order; [`stops`] holds the sequencing rules.

pub mod driver;
pub mod route;
pub mod stops;

pub use driver::{
    Driver, DriverCommand, DriverEvent, DriverId, DriverRegistered, DriverStatus,
    DriverStatusChanged, DriverUpdated, RegisterDriver, SetDriverStatus, UpdateDriver,
};
pub use route::{
    AddStop, AssignDriver, CompleteStop, DeliveryRoute, DriverAssigned, FailStop, PlanRoute,
    RemoveStop, ReorderStops, RouteCommand, RouteCompleted, RouteEvent, RouteId, RoutePlanned,
    RouteStarted, RouteStatus, StartRoute, StopAdded, StopCompleted, StopFailed, StopRemoved,
    StopsReordered,
};
pub use stops::{RouteStop, StopInput, StopStatus};
