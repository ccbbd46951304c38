//! End-to-end tests: queue → worker → HTTP receiver.
//!
//! Each test runs a real worker activation against an in-process axum
//! receiver that records every request and serves scripted status codes.

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use relaybox::config::{RelayConfig, StaticConfigProvider};
use relaybox::delivery::{HttpConfig, HttpDeliveryClient};
use relaybox::message::Message;
use relaybox::observability::Metrics;
use relaybox::queue::MessageStore;
use relaybox::worker::{Forwarder, StopReason};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::time::{Duration, timeout};

#[derive(Default)]
struct ReceiverState {
    /// (authorization header, parsed body) per request
    requests: Mutex<Vec<(Option<String>, serde_json::Value)>>,
    /// Statuses served in order; exhausted script means 200
    responses: Mutex<Vec<StatusCode>>,
}

impl ReceiverState {
    fn scripted(mut responses: Vec<StatusCode>) -> Arc<Self> {
        responses.reverse();
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responses: Mutex::new(responses),
        })
    }

    fn requests(&self) -> Vec<(Option<String>, serde_json::Value)> {
        self.requests.lock().unwrap().clone()
    }
}

async fn ingest(
    State(state): State<Arc<ReceiverState>>,
    headers: HeaderMap,
    body: String,
) -> StatusCode {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let json = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
    state.requests.lock().unwrap().push((auth, json));
    state
        .responses
        .lock()
        .unwrap()
        .pop()
        .unwrap_or(StatusCode::OK)
}

async fn start_receiver(state: Arc<ReceiverState>) -> String {
    let app = Router::new()
        .route("/ingest", post(ingest))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });

    format!("http://{addr}/ingest")
}

fn captured(id: i64, body: &str) -> Message {
    Message {
        id,
        sender: "+15550001".to_string(),
        body: body.to_string(),
        captured_at_millis: 1_700_000_000_000 + id,
        service_center_address: None,
        protocol_id: 0,
        delivery_status: 0,
        storage_index: -1,
    }
}

fn relay_config(endpoint: &str) -> RelayConfig {
    RelayConfig {
        api_endpoint: endpoint.to_string(),
        username: Some("a".to_string()),
        password: Some("b".to_string()),
        worker_poll_period_seconds: 1,
        worker_idle_attempt_threshold: 2,
        ..RelayConfig::default()
    }
}

async fn run_to_idle(store: Arc<MessageStore>, config: RelayConfig) -> StopReason {
    let provider = Arc::new(StaticConfigProvider::new(config));
    let client = Arc::new(HttpDeliveryClient::new(HttpConfig::default()).unwrap());
    let forwarder = Forwarder::new(store, client, provider, Arc::new(Metrics::new()));

    let mut handle = forwarder.spawn().unwrap();
    timeout(Duration::from_secs(30), handle.join())
        .await
        .expect("worker did not stop in time")
}

#[tokio::test]
async fn test_batch_is_delivered_authenticated_and_dequeued() {
    let state = ReceiverState::scripted(vec![]);
    let endpoint = start_receiver(state.clone()).await;

    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(MessageStore::open(temp_dir.path()).unwrap());
    store.append(&captured(1, "hi")).unwrap();
    store.append(&captured(2, "there")).unwrap();

    let reason = run_to_idle(store.clone(), relay_config(&endpoint)).await;
    assert_eq!(reason, StopReason::Idle);
    assert_eq!(store.count().unwrap(), 0);

    let requests = state.requests();
    assert_eq!(requests.len(), 1);

    // Basic auth for a:b
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Basic YTpi"));

    let batch = body.as_array().expect("body is a JSON array");
    assert_eq!(batch.len(), 2);

    let first = batch[0].as_object().unwrap();
    assert_eq!(first.len(), 8);
    assert_eq!(first["id"], 1);
    assert_eq!(first["sender"], "+15550001");
    assert_eq!(first["message"], "hi");
    assert_eq!(first["timestamp"], 1_700_000_000_001_i64);
    assert_eq!(first["serviceCenterAddress"], serde_json::Value::Null);
    assert_eq!(first["protocolIdentifier"], 0);
    assert_eq!(first["status"], 0);
    assert_eq!(first["indexOnIcc"], -1);
}

#[tokio::test]
async fn test_rejected_batch_survives_and_is_retried_verbatim() {
    let state = ReceiverState::scripted(vec![StatusCode::INTERNAL_SERVER_ERROR]);
    let endpoint = start_receiver(state.clone()).await;

    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(MessageStore::open(temp_dir.path()).unwrap());
    store.append(&captured(7, "try again")).unwrap();

    let reason = run_to_idle(store.clone(), relay_config(&endpoint)).await;
    assert_eq!(reason, StopReason::Idle);

    // First attempt got a 500 and deleted nothing; the retry carried the
    // identical payload and drained the queue.
    let requests = state.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].1, requests[1].1);
    assert_eq!(store.count().unwrap(), 0);
}

#[tokio::test]
async fn test_non_200_success_codes_are_rejections() {
    // 204 is not acceptance: the contract is exactly 200.
    let state = ReceiverState::scripted(vec![
        StatusCode::NO_CONTENT,
        StatusCode::NO_CONTENT,
        StatusCode::NO_CONTENT,
    ]);
    let endpoint = start_receiver(state.clone()).await;

    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(MessageStore::open(temp_dir.path()).unwrap());
    store.append(&captured(9, "stays")).unwrap();

    let provider = Arc::new(StaticConfigProvider::new(relay_config(&endpoint)));
    let client = Arc::new(HttpDeliveryClient::new(HttpConfig::default()).unwrap());
    let forwarder = Forwarder::new(store.clone(), client, provider, Arc::new(Metrics::new()));

    let mut handle = forwarder.spawn().unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    handle.stop();
    let reason = timeout(Duration::from_secs(30), handle.join())
        .await
        .expect("worker did not stop in time");

    assert_eq!(reason, StopReason::Cancelled);
    assert!(state.requests().len() >= 2);
    assert_eq!(store.count().unwrap(), 1);
}
