//! Queued message record and id allocation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// One captured message pending delivery.
///
/// The serialized field names are the wire contract with the receiving API:
/// `body` maps to `message` and `captured_at_millis` to `timestamp`. The
/// trailing integer fields are carried opaquely; the relay never interprets
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender: String,
    #[serde(rename = "message")]
    pub body: String,
    #[serde(rename = "timestamp")]
    pub captured_at_millis: i64,
    #[serde(rename = "serviceCenterAddress")]
    pub service_center_address: Option<String>,
    #[serde(rename = "protocolIdentifier")]
    pub protocol_id: i32,
    #[serde(rename = "status")]
    pub delivery_status: i32,
    #[serde(rename = "indexOnIcc")]
    pub storage_index: i32,
}

static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// Allocate a queue id for a freshly captured message.
///
/// Ids are epoch-millis seeded but strictly monotonic within the process,
/// so a burst of captures inside one millisecond still gets distinct ids.
pub fn next_message_id() -> i64 {
    let now = Utc::now().timestamp_millis();
    match LAST_ID.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        Some(now.max(last + 1))
    }) {
        Ok(last) => now.max(last + 1),
        Err(last) => last,
    }
}
