//! Warehouses domain module (event-sourced).
//!
//! Hubs that shipments leave from and arrive at.

pub mod warehouse;

pub use warehouse::{
    ActivateWarehouse, DeactivateWarehouse, RegisterWarehouse, UpdateWarehouse, Warehouse,
    WarehouseActivated, WarehouseCode, WarehouseCommand, WarehouseDeactivated, WarehouseEvent,
    WarehouseId, WarehouseRegistered, WarehouseStatus, WarehouseUpdated,
};
