use relaybox::config::{ConfigProvider, FileConfigProvider};
use relaybox::delivery::{HttpConfig, HttpDeliveryClient};
use relaybox::observability::Metrics;
use relaybox::queue::MessageStore;
use relaybox::worker::Forwarder;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Run one worker activation until it idles out or a signal arrives.
pub async fn run(config_path: Option<PathBuf>) -> Result<(), AnyError> {
    let provider = Arc::new(FileConfigProvider::new(config_path)?);
    let config = provider.current();

    let store = Arc::new(MessageStore::open(&config.data_dir)?);
    let client = Arc::new(HttpDeliveryClient::new(HttpConfig::default())?);
    let metrics = Arc::new(Metrics::new());

    let forwarder = Forwarder::new(store, client, provider, metrics.clone());
    let Some(mut handle) = forwarder.spawn() else {
        return Ok(());
    };

    info!(data_dir = %config.data_dir.display(), "Relay worker started");

    let self_stopped = tokio::select! {
        reason = handle.join() => Some(reason),
        _ = shutdown_signal() => None,
    };

    let reason = match self_stopped {
        Some(reason) => reason,
        None => {
            handle.stop();
            handle.join().await
        }
    };
    info!(?reason, "Worker stopped");

    let snap = metrics.snapshot();
    info!(
        batches = snap.batches_accepted,
        messages = snap.messages_delivered,
        rejected = snap.batches_rejected,
        "Delivery totals"
    );

    Ok(())
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
