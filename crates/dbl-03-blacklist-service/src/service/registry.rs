//! # Filter Registry
//!
//! Owns the filter cache and the in-memory filter objects built from it.
//!
//! ## Update Cycle
//!
//! 1. Sweep artifacts marked in earlier cycles and drop their filters
//! 2. Import every list whose configured version is newer than its head
//! 3. Mark superseded and orphaned artifacts
//! 4. Notify listeners when the head of any list changed
//!
//! Marking never removes a filter that is in use; removal waits for the
//! sweep at the start of the next cycle.
//!
//! Heads are compared against the set listeners last saw, so a cycle that
//! aborts after swapping some lists still notifies.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use dbl_01_domain_filters::{filters, FilterNode, SharedFilter};
use dbl_02_filter_cache::{CachedFileFilter, FilterCache};
use parking_lot::{Mutex, RwLock};
use shared_types::{BlacklistSource, CachedFilterKey, FilterFormat, ListId};
use tracing::{debug, info, warn};

use super::loader;
use crate::domain::{BlacklistConfig, UpdateSummary};
use crate::error::RegistryError;
use crate::metrics::{MetricsSnapshot, RegistryMetrics};
use crate::ports::FilterChangeListener;

enum ImportOutcome {
    Loaded(CachedFilterKey),
    LoadFailed(CachedFilterKey),
    Skipped,
}

pub struct FilterRegistry {
    config: BlacklistConfig,
    cache: FilterCache,
    filters: RwLock<HashMap<CachedFilterKey, FilterNode>>,
    listeners: RwLock<Vec<Arc<dyn FilterChangeListener>>>,
    /// Heads as of the last notification
    published: Mutex<BTreeSet<CachedFilterKey>>,
    metrics: RegistryMetrics,
}

impl FilterRegistry {
    /// Open the cache and load every live artifact.
    ///
    /// Artifacts that fail to load are logged and stay unavailable until a
    /// newer version is imported.
    pub fn open(config: BlacklistConfig) -> Result<Self, RegistryError> {
        config.validate()?;
        let cache = FilterCache::open(&config.cache_dir)?;
        let registry = Self {
            config,
            cache,
            filters: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
            published: Mutex::new(BTreeSet::new()),
            metrics: RegistryMetrics::new(),
        };

        let entries = registry.cache.file_filters();
        let mut loaded = 0usize;
        for entry in entries.iter().filter(|e| !e.deleted) {
            if registry.load(entry) {
                loaded += 1;
            }
        }
        *registry.published.lock() = registry.head_keys();
        info!(
            cache_dir = %registry.config.cache_dir.display(),
            artifacts = entries.len(),
            loaded,
            "Filter registry opened"
        );
        Ok(registry)
    }

    pub fn config(&self) -> &BlacklistConfig {
        &self.config
    }

    pub fn cache(&self) -> &FilterCache {
        &self.cache
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Filter for the newest non-deleted artifact of `id` that is loaded
    pub fn get_filter(&self, id: ListId) -> Option<FilterNode> {
        self.head(id).map(|(_, node)| node)
    }

    /// Like [`get_filter`](Self::get_filter) but always usable on domain
    /// names: hash lists are fronted by a hashing transform.
    pub fn get_domain_filter(&self, id: ListId) -> Option<SharedFilter<str>> {
        let (entry, node) = self.head(id)?;
        match node {
            FilterNode::Domain(filter) => Some(filter),
            FilterNode::Hash(filter) => {
                let algorithm = entry.format.hash_algorithm()?;
                Some(filters::hashing(algorithm, filter))
            }
        }
    }

    /// Number of filter objects currently held
    pub fn loaded_count(&self) -> usize {
        self.filters.read().len()
    }

    pub fn add_listener(&self, listener: Arc<dyn FilterChangeListener>) {
        self.listeners.write().push(listener);
    }

    /// Run one update cycle against the complete set of configured lists.
    ///
    /// Failures to load a single artifact are contained; failures to write
    /// the cache abort the cycle. Listeners hear about head changes either way.
    pub fn apply_update(&self, sources: &[BlacklistSource]) -> Result<UpdateSummary, RegistryError> {
        let result = self.run_cycle(sources);
        let heads_changed = self.publish_heads();
        let result = result.map(|summary| UpdateSummary {
            heads_changed,
            ..summary
        });
        self.metrics.record_cycle(result.is_ok());
        match &result {
            Ok(summary) => info!(
                imported = summary.imported.len(),
                failed = summary.failed.len(),
                removed = summary.removed.len(),
                skipped = summary.skipped.len(),
                heads_changed = summary.heads_changed,
                "Filter update cycle complete"
            ),
            Err(e) => warn!(error = %e, "Filter update cycle aborted"),
        }
        result
    }

    fn run_cycle(&self, sources: &[BlacklistSource]) -> Result<UpdateSummary, RegistryError> {
        let mut summary = UpdateSummary::default();

        summary.removed = self.cache.delete_marked_filters()?;
        if !summary.removed.is_empty() {
            let mut filters = self.filters.write();
            for key in &summary.removed {
                filters.remove(key);
            }
            self.metrics.record_evictions(summary.removed.len());
        }

        let mut live = HashSet::new();
        for source in sources {
            let format = match FilterFormat::from_tag(&source.format) {
                Ok(Some(format)) => format,
                Ok(None) => continue,
                Err(e) => {
                    warn!(list_id = source.id, error = %e, "Skipping list with invalid format");
                    live.insert(source.id);
                    summary.skipped.push(source.id);
                    continue;
                }
            };
            live.insert(source.id);

            let is_newer = self
                .cache
                .latest_file_filter_by_id(source.id)
                .map_or(true, |head| source.last_update > head.key.version);
            if !is_newer {
                continue;
            }

            match self.import(source, format)? {
                ImportOutcome::Loaded(key) => summary.imported.push(key),
                ImportOutcome::LoadFailed(key) => summary.failed.push(key),
                ImportOutcome::Skipped => summary.skipped.push(source.id),
            }
        }

        self.cache.mark_old_versions_as_deleted()?;
        self.cache.mark_non_existing_filters_as_deleted(&live)?;
        Ok(summary)
    }

    fn import(
        &self,
        source: &BlacklistSource,
        format: FilterFormat,
    ) -> Result<ImportOutcome, RegistryError> {
        let storage = source.storage_file.as_deref();
        if format.has_storage_file() && storage.is_none() {
            warn!(list_id = source.id, %format, "List has no storage file");
            return Ok(ImportOutcome::Skipped);
        }

        let generated = match (&source.bloom_file, storage) {
            (None, Some(storage)) => {
                match loader::generate_bloom_file(format, storage, self.config.bloom_fpp) {
                    Ok(path) => Some(path),
                    Err(e) => {
                        warn!(list_id = source.id, error = %e, "Failed to build bloom file");
                        return Ok(ImportOutcome::Skipped);
                    }
                }
            }
            _ => None,
        };
        let Some(bloom) = source.bloom_file.as_deref().or(generated.as_deref()) else {
            warn!(list_id = source.id, %format, "List has no bloom file");
            return Ok(ImportOutcome::Skipped);
        };

        let entry = self
            .cache
            .store_file_filter(source.id, source.last_update, format, storage, bloom)?;

        if self.load(&entry) {
            self.metrics.record_import();
            Ok(ImportOutcome::Loaded(entry.key))
        } else {
            self.cache.mark_deleted(&entry.key)?;
            Ok(ImportOutcome::LoadFailed(entry.key))
        }
    }

    fn load(&self, entry: &CachedFileFilter) -> bool {
        match loader::load_filter(&self.cache, entry) {
            Ok(node) => {
                debug!(key = %entry.key, filter = %node.name(), "Loaded filter");
                self.filters.write().insert(entry.key, node);
                true
            }
            Err(e) => {
                warn!(key = %entry.key, format = %entry.format, error = %e, "Failed to load filter");
                self.filters.write().remove(&entry.key);
                self.metrics.record_load_failure();
                false
            }
        }
    }

    fn head(&self, id: ListId) -> Option<(CachedFileFilter, FilterNode)> {
        let filters = self.filters.read();
        self.cache
            .file_filters_by_id(id)
            .into_iter()
            .filter(|entry| !entry.deleted)
            .find_map(|entry| {
                let node = filters.get(&entry.key)?.clone();
                Some((entry, node))
            })
    }

    fn head_keys(&self) -> BTreeSet<CachedFilterKey> {
        let index = self.cache.index();
        index
            .entries()
            .map(|entry| entry.key.id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|id| self.head(id).map(|(entry, _)| entry.key))
            .collect()
    }

    /// Notify listeners if the heads differ from the last published set
    fn publish_heads(&self) -> bool {
        let heads = self.head_keys();
        {
            let mut published = self.published.lock();
            if *published == heads {
                return false;
            }
            *published = heads;
        }
        self.notify();
        true
    }

    fn notify(&self) {
        let listeners = self.listeners.read().clone();
        debug!(listeners = listeners.len(), "Notifying filter change listeners");
        for listener in listeners {
            listener.on_filters_changed();
        }
        self.metrics.record_notification();
    }
}
