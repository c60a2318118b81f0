pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use crate::error::Result;
use crate::types::StoreAddress;
use async_trait::async_trait;
use std::collections::HashMap;

/// Key-value store holding the authoritative point values
///
/// Implementations must allow concurrent use from the synchronizer and the
/// write-back relay (pooled or per-call connections).
pub trait Store: Send + Sync {
    /// Read a scalar key or one field of a grouped record
    fn get(&self, address: &StoreAddress) -> Result<Option<String>>;

    /// Write a scalar key or one field of a grouped record
    fn set(&self, address: &StoreAddress, value: &str) -> Result<()>;

    /// Read every field of a grouped record
    fn read_record(&self, container: &str) -> Result<HashMap<String, String>>;
}

/// What happened to a changed key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Scalar value replaced
    Set,
    /// One or more fields of a grouped record written
    RecordSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub key: String,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn set(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: ChangeKind::Set,
        }
    }

    pub fn record_set(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: ChangeKind::RecordSet,
        }
    }

    /// Decode a keyspace notification (`__keyspace@<db>__:<key>`, payload =
    /// command name). Commands other than `set`/`hset` yield `None`.
    pub fn from_keyspace(channel: &str, payload: &str) -> Option<Self> {
        let rest = channel.strip_prefix("__keyspace@")?;
        let (_db, key) = rest.split_once("__:")?;
        if key.is_empty() {
            return None;
        }

        match payload {
            "set" => Some(Self::set(key)),
            "hset" => Some(Self::record_set(key)),
            _ => None,
        }
    }
}

/// Ordered stream of change events from one subscription
#[async_trait]
pub trait ChangeFeed: Send {
    /// Wait for the next event. `Ok(None)` means the subscription closed.
    async fn next_event(&mut self) -> Result<Option<ChangeEvent>>;
}

/// Something that can open a change subscription
#[async_trait]
pub trait NotificationSource: Send + Sync {
    async fn subscribe(&self) -> Result<Box<dyn ChangeFeed>>;
}
