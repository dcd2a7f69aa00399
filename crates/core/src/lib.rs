//! `cargohub-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by every logistics
//! module (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, TenantId};
pub use value_object::{Address, Rate, ValueObject};
