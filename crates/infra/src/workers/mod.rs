//! Background workers.

pub mod pipeline;
pub mod projection_worker;

pub use pipeline::{EventPipeline, PipelineError, PipelineOutcome};
pub use projection_worker::{ProjectionWorker, WorkerHandle};
