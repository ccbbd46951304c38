//! The poll-send-sleep loop.

use crate::config::{ConfigProvider, RelayConfig};
use crate::delivery::{DeliveryClient, DeliveryOutcome};
use crate::observability::Metrics;
use crate::queue::MessageStore;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Why the loop exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The idle-attempt threshold was reached with nothing left to forward.
    /// A later capture event is responsible for starting a new activation.
    Idle,
    /// An external shutdown signal arrived.
    Cancelled,
}

enum TickResult {
    Continue,
    Stop,
}

/// Run ticks until the idle threshold is reached or `shutdown` fires.
///
/// The loop suspends only inside the delivery call (bounded by its 15 s
/// timeouts) and during the inter-tick sleep; cancellation interrupts the
/// sleep but lets an in-flight delivery finish and honors its outcome.
pub async fn run_loop(
    store: Arc<MessageStore>,
    client: Arc<dyn DeliveryClient>,
    provider: Arc<dyn ConfigProvider>,
    metrics: Arc<Metrics>,
    mut shutdown: watch::Receiver<bool>,
) -> StopReason {
    let mut idle_ticks: u32 = 0;

    loop {
        // Re-read every tick so mid-run configuration edits apply without a
        // worker restart.
        let config = provider.current();

        if let TickResult::Stop =
            tick(&store, client.as_ref(), &config, &metrics, &mut idle_ticks).await
        {
            info!(idle_ticks, "Idle threshold reached, worker stopping");
            return StopReason::Idle;
        }

        tokio::select! {
            _ = tokio::time::sleep(config.poll_period()) => {}
            _ = shutdown.changed() => {
                info!("Shutdown signal received, worker stopping");
                return StopReason::Cancelled;
            }
        }
    }
}

async fn tick(
    store: &MessageStore,
    client: &dyn DeliveryClient,
    config: &RelayConfig,
    metrics: &Metrics,
    idle_ticks: &mut u32,
) -> TickResult {
    let batch = match store.read_all() {
        Ok(batch) => batch,
        Err(e) => {
            // Treated as transient: this tick is abandoned, the idle counter
            // is untouched, the next period retries.
            error!(error = %e, "Queue read failed, skipping tick");
            return TickResult::Continue;
        }
    };

    if batch.is_empty() {
        *idle_ticks += 1;
        metrics.idle_tick();
        debug!(idle_ticks = *idle_ticks, "No pending messages");
        if *idle_ticks >= config.idle_threshold() {
            return TickResult::Stop;
        }
        return TickResult::Continue;
    }

    // Work was attempted, so this is not an idle tick even if it fails.
    *idle_ticks = 0;

    if config.api_endpoint.is_empty() {
        warn!(
            count = batch.len(),
            "API endpoint is not set, batch retained"
        );
        metrics.batch_rejected();
        return TickResult::Continue;
    }

    let credentials = config.credentials();
    match client
        .send(&batch, &config.api_endpoint, credentials.as_ref())
        .await
    {
        DeliveryOutcome::Accepted => {
            let ids: Vec<i64> = batch.iter().map(|m| m.id).collect();
            match store.delete(&ids) {
                Ok(()) => {
                    metrics.batch_accepted(batch.len());
                    info!(count = batch.len(), "Batch delivered and dequeued");
                }
                Err(e) => {
                    // The batch was delivered but not dequeued; it will be
                    // re-sent next tick. At-least-once, duplicates possible.
                    error!(error = %e, "Dequeue after delivery failed");
                }
            }
        }
        DeliveryOutcome::Rejected { reason } => {
            metrics.batch_rejected();
            warn!(count = batch.len(), %reason, "Delivery failed, batch retained");
        }
    }

    TickResult::Continue
}
