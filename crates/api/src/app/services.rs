use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use cargohub_core::{AggregateId, TenantId};
use cargohub_events::{EventEnvelope, InMemoryEventBus};
use cargohub_infra::{
    command_dispatcher::{CommandDispatcher, DispatchError},
    config::AppConfig,
    event_store::{EventQuery, EventStore, InMemoryEventStore, StoredEvent},
    projections::ReadModels,
    streams::StreamKind,
    workers::{EventPipeline, PipelineError, ProjectionWorker, WorkerHandle},
};

/// Realtime message broadcasted via SSE.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RealtimeMessage {
    pub tenant_id: TenantId,
    pub topic: String,
    pub payload: JsonValue,
}

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
type Dispatcher = CommandDispatcher<Arc<dyn EventStore>, Bus>;

pub struct AppServices {
    dispatcher: Arc<Dispatcher>,
    query: Arc<dyn EventQuery>,
    read_models: Arc<ReadModels>,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
    config: AppConfig,
    backend: &'static str,
    worker: Mutex<Option<WorkerHandle>>,
}

impl std::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppServices")
            .field("backend", &self.backend)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Wire store, bus, projections and the background subscriber.
pub async fn build_services(config: AppConfig) -> anyhow::Result<AppServices> {
    if config.use_persistent_stores {
        #[cfg(feature = "postgres")]
        {
            return build_persistent_services(config).await;
        }
        #[cfg(not(feature = "postgres"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but postgres feature not enabled, falling back to in-memory"
            );
        }
    }

    let store = Arc::new(InMemoryEventStore::new());
    wire(config, store.clone(), store, Arc::new(ReadModels::new()), "in_memory")
}

#[cfg(feature = "postgres")]
async fn build_persistent_services(config: AppConfig) -> anyhow::Result<AppServices> {
    use anyhow::Context;
    use cargohub_infra::event_store::PostgresEventStore;

    let url = config
        .database_url
        .clone()
        .context("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")?;
    let store = Arc::new(
        PostgresEventStore::connect(&url)
            .await
            .context("failed to connect to postgres")?,
    );

    // Read models are in-memory; replay the full log before serving.
    let read_models = Arc::new(ReadModels::new());
    let log = store
        .load_all_async()
        .await
        .context("failed to load event log")?;
    let applied = read_models
        .rebuild(log.iter().map(StoredEvent::to_envelope))
        .context("failed to rebuild projections")?;
    tracing::info!(events = log.len(), applied, "projections rebuilt from event log");

    wire(config, store.clone(), store, read_models, "postgres")
}

fn wire(
    config: AppConfig,
    store: Arc<dyn EventStore>,
    query: Arc<dyn EventQuery>,
    read_models: Arc<ReadModels>,
    backend: &'static str,
) -> anyhow::Result<AppServices> {
    let bus: Bus = Arc::new(InMemoryEventBus::new());
    let dispatcher = Arc::new(CommandDispatcher::new(store, bus.clone()));
    let (realtime_tx, _) = broadcast::channel(config.realtime_channel_capacity.max(1));

    let pipeline = EventPipeline::new(dispatcher.clone(), read_models.clone());
    let tx = realtime_tx.clone();
    let worker = ProjectionWorker::spawn(
        "cargohub-projections",
        &bus,
        tokio::runtime::Handle::try_current().ok(),
        move |env: EventEnvelope<JsonValue>| -> Result<(), PipelineError> {
            let outcome = pipeline.handle(&env)?;
            if outcome.projected {
                // No SSE subscribers is fine.
                let _ = tx.send(realtime_message(&env));
            }
            Ok(())
        },
    )?;

    Ok(AppServices {
        dispatcher,
        query,
        read_models,
        realtime_tx,
        config,
        backend,
        worker: Mutex::new(Some(worker)),
    })
}

fn realtime_message(env: &EventEnvelope<JsonValue>) -> RealtimeMessage {
    let event = env.event_name().unwrap_or_default();
    RealtimeMessage {
        tenant_id: env.tenant_id(),
        topic: env.aggregate_type().to_string(),
        payload: serde_json::json!({
            "aggregate_id": env.aggregate_id().to_string(),
            "sequence_number": env.sequence_number(),
            "event": event,
        }),
    }
}

impl AppServices {
    pub fn dispatch<A: StreamKind>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        command: A::Command,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher.execute::<A>(tenant_id, aggregate_id, command)
    }

    pub fn read_models(&self) -> &ReadModels {
        &self.read_models
    }

    pub fn query(&self) -> &dyn EventQuery {
        self.query.as_ref()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        &self.realtime_tx
    }

    /// Stop the background subscriber. Later calls do nothing.
    pub fn shutdown_worker(&self) {
        let handle = match self.worker.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(h) = handle {
            h.shutdown();
        }
    }
}

pub fn tenant_sse_stream(
    services: Arc<AppServices>,
    tenant_id: TenantId,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(m) if m.tenant_id == tenant_id => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        // Lagged receivers skip what they missed.
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
