//! Batch delivery to the remote HTTP receiver.

use crate::message::Message;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP client construction failed: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// Result of one batch delivery attempt.
///
/// Rejections are data, not errors: the worker keeps the batch queued and
/// tries again on its next tick, so a duplicate delivery is possible and the
/// receiver must tolerate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Accepted,
    Rejected { reason: String },
}

impl DeliveryOutcome {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// HTTP Basic credentials for the receiver.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Seam between the worker loop and the network, so tests can script
/// outcomes without a live receiver.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    /// Deliver one non-empty batch. All-or-nothing: there is no per-message
    /// acknowledgment within a batch. Never panics and never returns an
    /// error; every network or encoding fault becomes a `Rejected` outcome.
    async fn send(
        &self,
        batch: &[Message],
        endpoint: &str,
        credentials: Option<&Credentials>,
    ) -> DeliveryOutcome;
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(15),
            user_agent: "relaybox/0.1.0".to_string(),
        }
    }
}

/// Real delivery client: one authenticated JSON POST per batch.
pub struct HttpDeliveryClient {
    client: Client,
}

impl HttpDeliveryClient {
    pub fn new(config: HttpConfig) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl DeliveryClient for HttpDeliveryClient {
    async fn send(
        &self,
        batch: &[Message],
        endpoint: &str,
        credentials: Option<&Credentials>,
    ) -> DeliveryOutcome {
        let payload = match serde_json::to_vec(batch) {
            Ok(payload) => payload,
            Err(e) => return DeliveryOutcome::rejected(format!("Payload encoding failed: {e}")),
        };

        debug!(endpoint, count = batch.len(), "Posting batch");

        let mut request = self
            .client
            .post(endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .body(payload);

        if let Some(creds) = credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(endpoint, "Delivery timed out");
                return DeliveryOutcome::rejected("Request timed out");
            }
            Err(e) => {
                warn!(endpoint, error = %e, "Delivery transport failed");
                return DeliveryOutcome::rejected(e.to_string());
            }
        };

        // The receiver contract is exactly 200, not any 2xx.
        let status = response.status();
        if status == StatusCode::OK {
            debug!(count = batch.len(), "Batch accepted by receiver");
            DeliveryOutcome::Accepted
        } else {
            warn!(endpoint, %status, "Receiver rejected batch");
            DeliveryOutcome::rejected(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ))
        }
    }
}
