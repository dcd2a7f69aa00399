//! Per-envelope work done by the background subscriber.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;

use cargohub_events::{EventBus, EventEnvelope};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::EventStore;
use crate::projections::{ProjectionError, ReadModels};
use crate::reactors::ShipmentNotifier;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("reactor failed: {0}")]
    Reactor(#[from] DispatchError),
}

/// What one envelope did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOutcome {
    /// A read model changed.
    pub projected: bool,
    /// A follow-up notification was dispatched.
    pub notified: bool,
}

/// Projections first, then reactors.
#[derive(Debug)]
pub struct EventPipeline<S, B> {
    dispatcher: Arc<CommandDispatcher<S, B>>,
    read_models: Arc<ReadModels>,
    notifier: ShipmentNotifier,
}

impl<S, B> EventPipeline<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(dispatcher: Arc<CommandDispatcher<S, B>>, read_models: Arc<ReadModels>) -> Self {
        Self {
            dispatcher,
            read_models,
            notifier: ShipmentNotifier,
        }
    }

    pub fn read_models(&self) -> &Arc<ReadModels> {
        &self.read_models
    }

    /// Project the envelope and run reactors on it.
    ///
    /// The reactor runs even when the projection fails.
    pub fn handle(&self, envelope: &EventEnvelope<JsonValue>) -> Result<PipelineOutcome, PipelineError> {
        let projected = self
            .read_models
            .apply_or_catch_up(self.dispatcher.store(), envelope);
        let notified = self.notifier.react(&self.dispatcher, envelope)?.is_some();

        Ok(PipelineOutcome {
            projected: projected?,
            notified,
        })
    }
}
