use crate::error::Result;
use crate::mapping::{MappingTable, PointRecord};
use crate::model::Model;
use crate::relay::WriteRelay;
use crate::store::{NotificationSource, Store};
use crate::sync::Synchronizer;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Glue between the store, the model and the mapping table
///
/// Builds the table once and hands the same immutable copy to both
/// directions:
/// - the synchronizer (store → model), driven by `run`
/// - the write relay (model → store), to be registered with the model
pub struct Bridge<S, M> {
    table: Arc<MappingTable>,
    store: Arc<S>,
    synchronizer: Synchronizer<S, M>,
    relay: Arc<WriteRelay<S>>,
}

impl<S, M> Bridge<S, M>
where
    S: Store + NotificationSource + 'static,
    M: Model + 'static,
{
    pub fn new(records: &[PointRecord], store: Arc<S>, model: Arc<M>) -> Self {
        let table = Arc::new(MappingTable::build(records, model.as_ref()));
        let synchronizer =
            Synchronizer::new(Arc::clone(&table), Arc::clone(&store), Arc::clone(&model));
        let relay = Arc::new(WriteRelay::new(Arc::clone(&table), Arc::clone(&store)));

        Self {
            table,
            store,
            synchronizer,
            relay,
        }
    }

    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.synchronizer = self.synchronizer.with_reconnect_backoff(backoff);
        self
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    /// Listener to register on the model's write path
    pub fn relay(&self) -> Arc<WriteRelay<S>> {
        Arc::clone(&self.relay)
    }

    /// Follow the store until `shutdown` resolves
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.synchronizer.run(self.store.as_ref(), shutdown).await
    }
}
