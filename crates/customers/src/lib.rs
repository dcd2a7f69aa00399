//! Customers domain module (event-sourced).
//!
//! Shippers and consignees billed by the operator, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod customer;

pub use customer::{
    Customer, CustomerCommand, CustomerEvent, CustomerId, CustomerReactivated, CustomerRegistered,
    CustomerStatus, CustomerSuspended, CustomerUpdated, ReactivateCustomer, RegisterCustomer,
    SuspendCustomer, UpdateCustomer,
};
