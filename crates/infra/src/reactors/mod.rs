//! Event reactors: follow-up commands triggered by published events.

pub mod shipment_notifications;

pub use shipment_notifications::{ShipmentNotifier, notification_for};
