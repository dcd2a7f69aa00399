//! Shipments domain module (event-sourced).
//!
//! A shipment moves between two warehouses along a fixed status progression.
//! Every transition appends to its tracking history; see [`tracking`].

pub mod shipment;
pub mod tracking;

pub use shipment::{
    CancelShipment, CreateShipment, ReturnShipment, Shipment, ShipmentCancelled, ShipmentCommand,
    ShipmentCreated, ShipmentEvent, ShipmentId, ShipmentReturned, ShipmentStatusUpdated,
    UpdateShipmentStatus,
};
pub use tracking::{ShipmentStatus, TrackingEntry, history_until, progression_between};
