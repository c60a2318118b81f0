use crate::codec;
use crate::error::Result;
use crate::mapping::{MappingEntry, MappingTable};
use crate::model::Model;
use crate::store::{ChangeEvent, ChangeFeed, ChangeKind, NotificationSource, Store};
use crate::types::StoreAddress;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Counters for one sync pass or one notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Values decoded and pushed to the model
    pub pushed: usize,
    /// Mapped addresses with no value in the store
    pub absent: usize,
    /// Changed addresses with no mapping
    pub unmapped: usize,
    /// Values that failed to decode
    pub failed: usize,
}

impl SyncReport {
    fn record(&mut self, pushed: bool) {
        if pushed {
            self.pushed += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Store → model direction
///
/// Establishes the model's initial state from the store, then follows the
/// store's change notifications one at a time, in delivery order.
pub struct Synchronizer<S, M> {
    table: Arc<MappingTable>,
    store: Arc<S>,
    model: Arc<M>,
    reconnect_backoff: Duration,
}

impl<S: Store, M: Model> Synchronizer<S, M> {
    pub fn new(table: Arc<MappingTable>, store: Arc<S>, model: Arc<M>) -> Self {
        Self {
            table,
            store,
            model,
            reconnect_backoff: Duration::from_secs(5),
        }
    }

    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    /// Read every mapped address once and push what is present
    ///
    /// Absent values leave the point unset. A store failure aborts the pass.
    pub fn initial_sync(&self) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        for entry in self.table.entries() {
            match self.store.get(&entry.store_address)? {
                Some(text) => report.record(self.apply(entry, &text)),
                None => {
                    trace!("{} absent from store, left unset", entry.store_address);
                    report.absent += 1;
                }
            }
        }

        Ok(report)
    }

    /// Process a single change notification
    ///
    /// Decode failures are contained per point; only store failures are
    /// returned.
    pub fn handle_event(&self, event: &ChangeEvent) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        match event.kind {
            ChangeKind::Set => {
                let address = StoreAddress::Key(event.key.clone());
                let Some(entry) = self.table.by_store_address(&address) else {
                    report.unmapped += 1;
                    return Ok(report);
                };
                match self.store.get(&address)? {
                    Some(text) => report.record(self.apply(entry, &text)),
                    None => report.absent += 1,
                }
            }
            ChangeKind::RecordSet => {
                let fields: BTreeMap<String, String> =
                    self.store.read_record(&event.key)?.into_iter().collect();
                for (field, text) in fields {
                    let address = StoreAddress::field(event.key.as_str(), field);
                    match self.table.by_store_address(&address) {
                        Some(entry) => report.record(self.apply(entry, &text)),
                        None => report.unmapped += 1,
                    }
                }
            }
        }

        Ok(report)
    }

    fn apply(&self, entry: &MappingEntry, text: &str) -> bool {
        match codec::decode(entry.kind(), text) {
            Ok(value) => {
                trace!("{} -> {} = {:?}", entry.store_address, entry.handle.key(), value);
                self.model.push_value(&entry.handle, value);
                true
            }
            Err(e) => {
                warn!(
                    "Cannot set {} from {} with value '{}': {}",
                    entry.handle.key(),
                    entry.store_address,
                    text,
                    e
                );
                false
            }
        }
    }

    /// Subscribe, load initial values, then follow notifications until
    /// `shutdown` resolves
    ///
    /// Failing to subscribe or to load the initial values is returned as an
    /// error. Once running, a lost subscription is reopened after the
    /// reconnect backoff and followed by a full re-sync.
    pub async fn run<N, F>(&self, source: &N, shutdown: F) -> Result<()>
    where
        N: NotificationSource + ?Sized,
        F: Future<Output = ()>,
    {
        let mut feed = source.subscribe().await?;
        let report = self.initial_sync()?;
        info!(
            "Initial sync: {} pushed, {} absent, {} failed",
            report.pushed, report.absent, report.failed
        );

        tokio::pin!(shutdown);

        loop {
            let next = tokio::select! {
                _ = shutdown.as_mut() => {
                    info!("Synchronizer stopping");
                    return Ok(());
                }
                next = feed.next_event() => next,
            };

            let lost = match next {
                Ok(Some(event)) => match self.handle_event(&event) {
                    Ok(report) => {
                        debug!(
                            "{:?} {}: {} pushed, {} unmapped, {} failed",
                            event.kind, event.key, report.pushed, report.unmapped, report.failed
                        );
                        false
                    }
                    Err(e) => {
                        error!("Store failure while handling {}: {}", event.key, e);
                        true
                    }
                },
                Ok(None) => {
                    warn!("Store subscription closed");
                    true
                }
                Err(e) => {
                    error!("Store subscription error: {}", e);
                    true
                }
            };

            if lost {
                match self.reconnect(source, &mut shutdown).await {
                    Some(reopened) => feed = reopened,
                    None => {
                        info!("Synchronizer stopping");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Reopen the subscription and re-sync; `None` if shut down meanwhile
    async fn reconnect<N, F>(
        &self,
        source: &N,
        shutdown: &mut Pin<&mut F>,
    ) -> Option<Box<dyn ChangeFeed>>
    where
        N: NotificationSource + ?Sized,
        F: Future<Output = ()>,
    {
        loop {
            tokio::select! {
                _ = shutdown.as_mut() => return None,
                _ = tokio::time::sleep(self.reconnect_backoff) => {}
            }

            let feed = match source.subscribe().await {
                Ok(feed) => feed,
                Err(e) => {
                    warn!("Resubscribe failed: {}", e);
                    continue;
                }
            };

            match self.initial_sync() {
                Ok(report) => {
                    info!("Resubscribed, re-sync pushed {} values", report.pushed);
                    return Some(feed);
                }
                Err(e) => warn!("Re-sync after resubscribe failed: {}", e),
            }
        }
    }
}
