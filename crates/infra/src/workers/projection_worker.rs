use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::warn;

use cargohub_events::{EventBus, Subscription};

const TICK: Duration = Duration::from_millis(250);

/// Handle to stop and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Bus subscriber loop on a dedicated thread.
///
/// The handler sees every message in bus order and must be idempotent.
/// Handler errors are logged and the loop keeps running.
#[derive(Debug)]
pub struct ProjectionWorker;

impl ProjectionWorker {
    /// Subscribe to `bus` and spawn the worker thread.
    ///
    /// When `runtime` is given the thread enters it, so handlers can reach
    /// async backends through blocking bridges.
    pub fn spawn<M, B, H, E>(
        name: &'static str,
        bus: &B,
        runtime: Option<Handle>,
        mut handler: H,
    ) -> io::Result<WorkerHandle>
    where
        M: Send + 'static,
        B: EventBus<M>,
        H: FnMut(M) -> Result<(), E> + Send + 'static,
        E: core::fmt::Debug + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub: Subscription<M> = bus.subscribe();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _guard = runtime.as_ref().map(Handle::enter);
                worker_loop(name, sub, shutdown_rx, &mut handler)
            })?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop<M, H, E>(
    name: &'static str,
    sub: Subscription<M>,
    shutdown_rx: mpsc::Receiver<()>,
    handler: &mut H,
) where
    H: FnMut(M) -> Result<(), E>,
    E: core::fmt::Debug,
{
    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(TICK) {
            Ok(msg) => {
                if let Err(err) = handler(msg) {
                    warn!(worker = name, error = ?err, "projection worker handler failed");
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use cargohub_events::InMemoryEventBus;

    use super::*;

    #[test]
    fn handler_errors_do_not_stop_the_loop() {
        let bus: InMemoryEventBus<u32> = InMemoryEventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let (done_tx, done_rx) = mpsc::channel();

        let handle = ProjectionWorker::spawn("test-worker", &bus, None, move |n: u32| {
            counter.fetch_add(1, Ordering::SeqCst);
            if n == 3 {
                let _ = done_tx.send(());
            }
            if n % 2 == 0 { Err("even") } else { Ok(()) }
        })
        .unwrap();

        for n in 0..4 {
            bus.publish(n).unwrap();
        }
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        handle.shutdown();

        assert_eq!(seen.load(Ordering::SeqCst), 4);
    }
}
