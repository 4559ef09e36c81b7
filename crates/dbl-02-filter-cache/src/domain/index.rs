//! # Cache Index
//!
//! The single record of which artifacts exist. Per list id, entries are
//! kept sorted by version, newest first, so the head of a list is the
//! first entry that is not marked deleted.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use shared_types::{CachedFilterKey, ListId};

use super::entities::CachedFileFilter;

/// Index layout written by this version
pub const CURRENT_INDEX_FORMAT: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheIndex {
    pub format: u32,
    pub filters: BTreeMap<ListId, Vec<CachedFileFilter>>,
}

impl Default for CacheIndex {
    fn default() -> Self {
        Self {
            format: CURRENT_INDEX_FORMAT,
            filters: BTreeMap::new(),
        }
    }
}

impl CacheIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert keeping newest-first order; an entry with the same key is replaced.
    pub fn insert(&mut self, entry: CachedFileFilter) {
        let list = self.filters.entry(entry.key.id).or_default();
        list.retain(|e| e.key != entry.key);
        let position = list.partition_point(|e| e.key.version > entry.key.version);
        list.insert(position, entry);
    }

    pub fn get(&self, key: &CachedFilterKey) -> Option<&CachedFileFilter> {
        self.by_id(key.id).iter().find(|e| e.key == *key)
    }

    /// Entries for one list, newest first
    pub fn by_id(&self, id: ListId) -> &[CachedFileFilter] {
        self.filters.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entries(&self) -> impl Iterator<Item = &CachedFileFilter> {
        self.filters.values().flatten()
    }

    /// Head version of a list
    pub fn latest(&self, id: ListId) -> Option<&CachedFileFilter> {
        self.by_id(id).iter().find(|e| !e.deleted)
    }

    pub fn len(&self) -> usize {
        self.filters.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Mark one entry deleted; returns whether it changed
    pub fn mark(&mut self, key: &CachedFilterKey) -> bool {
        let entry = self
            .filters
            .get_mut(&key.id)
            .and_then(|list| list.iter_mut().find(|e| e.key == *key));
        match entry {
            Some(entry) if !entry.deleted => {
                entry.deleted = true;
                true
            }
            _ => false,
        }
    }

    /// Mark every live entry behind each head; returns the newly marked keys
    pub fn mark_old_versions(&mut self) -> Vec<CachedFilterKey> {
        let mut marked = Vec::new();
        for list in self.filters.values_mut() {
            let mut seen_head = false;
            for entry in list.iter_mut().filter(|e| !e.deleted) {
                if seen_head {
                    entry.deleted = true;
                    marked.push(entry.key);
                } else {
                    seen_head = true;
                }
            }
        }
        marked
    }

    /// Mark every live entry whose id is not in `live`
    pub fn mark_absent(&mut self, live: &HashSet<ListId>) -> Vec<CachedFilterKey> {
        let mut marked = Vec::new();
        for (id, list) in self.filters.iter_mut() {
            if live.contains(id) {
                continue;
            }
            for entry in list.iter_mut().filter(|e| !e.deleted) {
                entry.deleted = true;
                marked.push(entry.key);
            }
        }
        marked
    }

    pub fn marked(&self) -> Vec<CachedFileFilter> {
        self.entries().filter(|e| e.deleted).cloned().collect()
    }

    /// Drop an entry; a list left empty disappears from the index
    pub fn remove(&mut self, key: &CachedFilterKey) -> Option<CachedFileFilter> {
        let list = self.filters.get_mut(&key.id)?;
        let position = list.iter().position(|e| e.key == *key)?;
        let removed = list.remove(position);
        if list.is_empty() {
            self.filters.remove(&key.id);
        }
        Some(removed)
    }
}
