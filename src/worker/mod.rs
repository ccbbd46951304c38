//! Delivery worker service
//!
//! One background activation at a time polls the queue, posts batches to
//! the receiver, and stops itself after sustained idleness.

pub mod runner;

pub use runner::StopReason;

use crate::config::ConfigProvider;
use crate::delivery::DeliveryClient;
use crate::observability::Metrics;
use crate::queue::MessageStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Handle to one running worker activation.
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<StopReason>,
}

impl WorkerHandle {
    /// Ask the loop to stop. The inter-tick sleep is interrupted promptly;
    /// an in-flight delivery finishes first and its outcome is honored.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Wait for the loop to exit.
    pub async fn join(&mut self) -> StopReason {
        (&mut self.join).await.unwrap_or(StopReason::Cancelled)
    }
}

/// Spawns delivery workers, at most one active at a time.
///
/// Starting an activation while one is already running is coalesced into a
/// no-op: the running loop picks up whatever was enqueued on its next tick,
/// and two loops competing over the same batch would double-deliver.
pub struct Forwarder {
    store: Arc<MessageStore>,
    client: Arc<dyn DeliveryClient>,
    provider: Arc<dyn ConfigProvider>,
    metrics: Arc<Metrics>,
    running: Arc<AtomicBool>,
}

impl Forwarder {
    pub fn new(
        store: Arc<MessageStore>,
        client: Arc<dyn DeliveryClient>,
        provider: Arc<dyn ConfigProvider>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            client,
            provider,
            metrics,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a worker activation. Returns `None` if one is already running.
    pub fn spawn(&self) -> Option<WorkerHandle> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Worker already active, activation coalesced");
            return None;
        }

        let (shutdown, rx) = watch::channel(false);
        let store = self.store.clone();
        let client = self.client.clone();
        let provider = self.provider.clone();
        let metrics = self.metrics.clone();
        let running = self.running.clone();

        let join = tokio::spawn(async move {
            let reason = runner::run_loop(store, client, provider, metrics, rx).await;
            running.store(false, Ordering::SeqCst);
            reason
        });

        Some(WorkerHandle { shutdown, join })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
