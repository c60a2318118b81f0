use crate::error::{BridgeError, Result};
use crate::store::{ChangeEvent, ChangeFeed, NotificationSource, Store};
use crate::types::StoreAddress;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// In-memory store for testing and store-less runs
///
/// Behaves like a keyspace-notifying store: every `set` is announced to all
/// open subscriptions, in order.
#[derive(Default)]
pub struct MemoryStore {
    strings: RwLock<HashMap<String, String>>,
    records: RwLock<HashMap<String, HashMap<String, String>>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ChangeEvent>>>,
    offline: RwLock<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a value without announcing it
    pub fn seed(&self, address: &StoreAddress, value: &str) {
        match address {
            StoreAddress::Key(key) => {
                self.strings.write().insert(key.clone(), value.to_string());
            }
            StoreAddress::Field { container, field } => {
                self.records
                    .write()
                    .entry(container.clone())
                    .or_default()
                    .insert(field.clone(), value.to_string());
            }
        }
    }

    /// Announce an event to every subscriber without touching data
    pub fn emit(&self, event: ChangeEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Close all open subscriptions, as a dropped connection would
    pub fn close_subscriptions(&self) {
        self.subscribers.lock().clear();
    }

    /// While offline every operation fails with a transport error
    pub fn set_offline(&self, offline: bool) {
        *self.offline.write() = offline;
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn check_online(&self) -> Result<()> {
        if *self.offline.read() {
            return Err(BridgeError::Transport("store offline".to_string()));
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn get(&self, address: &StoreAddress) -> Result<Option<String>> {
        self.check_online()?;
        let value = match address {
            StoreAddress::Key(key) => self.strings.read().get(key).cloned(),
            StoreAddress::Field { container, field } => self
                .records
                .read()
                .get(container)
                .and_then(|r| r.get(field))
                .cloned(),
        };
        Ok(value)
    }

    fn set(&self, address: &StoreAddress, value: &str) -> Result<()> {
        self.check_online()?;
        self.seed(address, value);
        let event = match address {
            StoreAddress::Key(key) => ChangeEvent::set(key.clone()),
            StoreAddress::Field { container, .. } => ChangeEvent::record_set(container.clone()),
        };
        self.emit(event);
        Ok(())
    }

    fn read_record(&self, container: &str) -> Result<HashMap<String, String>> {
        self.check_online()?;
        Ok(self
            .records
            .read()
            .get(container)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl NotificationSource for MemoryStore {
    async fn subscribe(&self) -> Result<Box<dyn ChangeFeed>> {
        self.check_online()?;
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        Ok(Box::new(MemoryFeed { rx }))
    }
}

struct MemoryFeed {
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
}

#[async_trait]
impl ChangeFeed for MemoryFeed {
    async fn next_event(&mut self) -> Result<Option<ChangeEvent>> {
        Ok(self.rx.recv().await)
    }
}
