//! Infrastructure layer: event store, command dispatch, read models,
//! reactors, background workers and configuration.

pub mod command_dispatcher;
pub mod config;
pub mod event_store;
pub mod projections;
pub mod reactors;
pub mod read_model;
pub mod streams;
pub mod workers;

mod integration_tests;
