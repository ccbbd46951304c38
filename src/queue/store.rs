use crate::message::Message;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("Message decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// MessageStore persists pending messages using the Fjall embedded database.
///
/// Architecture:
/// - `pending` partition: i64 id (big-endian) → Message (JSON)
///
/// Big-endian keys keep iteration in id order, which is capture order for
/// monotonic ids. Every operation takes the same lock: the capture path and
/// the delivery worker access the store concurrently, and call volume is far
/// too low to justify anything finer-grained.
///
/// Items are immutable once appended; the only mutations are whole-item
/// `append` and `delete`.
pub struct MessageStore {
    keyspace: Keyspace,
    pending: PartitionHandle,
    lock: Mutex<()>,
}

impl MessageStore {
    /// Open or create a MessageStore at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Opening MessageStore at: {}", path.as_ref().display());

        let keyspace = Config::new(path).open()?;
        let pending = keyspace.open_partition("pending", PartitionCreateOptions::default())?;

        Ok(Self {
            keyspace,
            pending,
            lock: Mutex::new(()),
        })
    }

    /// Persist one message. It is visible to `read_all` and durable on disk
    /// before this returns.
    pub fn append(&self, msg: &Message) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let value = serde_json::to_vec(msg)?;
        self.pending.insert(msg.id.to_be_bytes(), value)?;
        self.keyspace.persist(PersistMode::SyncAll)?;

        debug!(id = msg.id, sender = %msg.sender, "Message appended to queue");

        Ok(())
    }

    /// Snapshot of every currently queued message, in id order.
    pub fn read_all(&self) -> Result<Vec<Message>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut messages = Vec::new();
        for item in self.pending.iter() {
            let (_key, value) = item?;
            messages.push(serde_json::from_slice(&value)?);
        }

        Ok(messages)
    }

    /// Remove exactly the messages with these ids. Unknown ids and an empty
    /// slice are no-ops.
    pub fn delete(&self, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        for id in ids {
            self.pending.remove(id.to_be_bytes())?;
        }
        self.keyspace.persist(PersistMode::SyncAll)?;

        debug!(count = ids.len(), "Messages deleted from queue");

        Ok(())
    }

    /// Number of queued messages (diagnostics; the worker does not need it).
    pub fn count(&self) -> Result<usize> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut count = 0;
        for item in self.pending.iter() {
            item?;
            count += 1;
        }
        Ok(count)
    }
}
