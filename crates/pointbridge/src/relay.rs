use crate::codec;
use crate::mapping::MappingTable;
use crate::model::{WriteListener, WriteRequest};
use crate::store::Store;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Counters for one relayed write batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub relayed: usize,
    pub unmapped: usize,
    pub failed: usize,
}

/// Model → store direction
///
/// Each attribute of a write batch is relayed on its own: an unmapped or
/// failing attribute never keeps the rest of the batch from the store.
pub struct WriteRelay<S> {
    table: Arc<MappingTable>,
    store: Arc<S>,
}

impl<S: Store> WriteRelay<S> {
    pub fn new(table: Arc<MappingTable>, store: Arc<S>) -> Self {
        Self { table, store }
    }

    pub fn relay(&self, batch: &[WriteRequest]) -> RelayReport {
        let mut report = RelayReport::default();

        for request in batch {
            let key = request.handle.key();
            let Some(entry) = self.table.by_attribute(key) else {
                trace!("{} is not mapped to the store", key);
                report.unmapped += 1;
                continue;
            };

            let text = match codec::encode(entry.kind(), &request.value) {
                Ok(text) => text,
                Err(e) => {
                    warn!(
                        "Cannot write {} to {} with value {:?}: {}",
                        key, entry.store_address, request.value, e
                    );
                    report.failed += 1;
                    continue;
                }
            };

            match self.store.set(&entry.store_address, &text) {
                Ok(()) => {
                    debug!("{} -> {} = {}", key, entry.store_address, text);
                    report.relayed += 1;
                }
                Err(e) => {
                    warn!(
                        "Failed to write {} = {} for {}: {}",
                        entry.store_address, text, key, e
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }
}

impl<S: Store> WriteListener for WriteRelay<S> {
    fn on_write(&self, batch: &[WriteRequest]) {
        let report = self.relay(batch);
        debug!(
            "Write batch of {}: {} relayed, {} unmapped, {} failed",
            batch.len(),
            report.relayed,
            report.unmapped,
            report.failed
        );
    }
}
