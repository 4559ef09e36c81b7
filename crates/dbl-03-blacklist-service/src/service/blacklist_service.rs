//! Domain blacklist service
//!
//! Ties the registry to the update worker and implements the inbound port.

use std::sync::Arc;

use dbl_01_domain_filters::{FilterNode, SharedFilter};
use shared_types::{BlacklistSource, ListId};
use tracing::info;

use super::registry::FilterRegistry;
use super::worker::{UpdateTicket, UpdateWorker};
use crate::domain::BlacklistConfig;
use crate::error::RegistryError;
use crate::metrics::MetricsSnapshot;
use crate::ports::{FilterChangeListener, FilterRegistryApi};

pub struct DomainBlacklistService {
    registry: Arc<FilterRegistry>,
    worker: UpdateWorker,
}

impl DomainBlacklistService {
    /// Open the cache, load cached filters and start the update worker.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start(config: BlacklistConfig) -> Result<Self, RegistryError> {
        let registry = Arc::new(FilterRegistry::open(config)?);
        let worker = UpdateWorker::spawn(registry.clone());
        info!("Domain blacklist service started");
        Ok(Self { registry, worker })
    }

    pub fn registry(&self) -> &Arc<FilterRegistry> {
        &self.registry
    }

    pub fn get_domain_filter(&self, id: ListId) -> Option<SharedFilter<str>> {
        self.registry.get_domain_filter(id)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.registry.metrics()
    }

    /// Finish queued cycles, stop the worker and release the cache lock.
    pub async fn shutdown(mut self) -> Result<(), RegistryError> {
        self.worker.shutdown().await?;
        info!("Domain blacklist service stopped");
        Ok(())
    }
}

impl FilterRegistryApi for DomainBlacklistService {
    fn get_filter(&self, id: ListId) -> Option<FilterNode> {
        self.registry.get_filter(id)
    }

    fn set_filters(&self, sources: Vec<BlacklistSource>) -> UpdateTicket {
        self.worker.submit(sources)
    }

    fn add_listener(&self, listener: Arc<dyn FilterChangeListener>) {
        self.registry.add_listener(listener);
    }
}
