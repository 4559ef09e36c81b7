//! # LRU Decision Cache
//!
//! Wraps a string filter with a bounded map from domain to decision.
//!
//! ## Policy
//!
//! - `CacheMode::All`: remember every decision
//! - `CacheMode::Blocked`: remember blocks only, so high-cardinality
//!   allowed traffic does not evict the reusable blocked set
//! - `CacheMode::NotBlocked`: remember passes only
//!
//! The lock guards the LRU map only; the wrapped filter is always
//! consulted without holding it.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;

use crate::domain::{Decision, DecisionFor, DomainFilter, Domains, FilterNode, SharedFilter};
use crate::error::FilterError;

/// Which decisions are remembered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    All,
    Blocked,
    NotBlocked,
}

impl CacheMode {
    fn admits(self, blocked: bool) -> bool {
        match self {
            CacheMode::All => true,
            CacheMode::Blocked => blocked,
            CacheMode::NotBlocked => !blocked,
        }
    }
}

/// Point-in-time counters of a caching filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub requests: u64,
    pub hits: u64,
    /// Lookups that reached the wrapped filter
    pub loads: u64,
    pub entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        self.hits as f64 / self.requests as f64
    }
}

pub struct CachingFilter {
    inner: SharedFilter<str>,
    cache: Mutex<LruCache<String, Decision<String>>>,
    mode: CacheMode,
    requests: AtomicU64,
    hits: AtomicU64,
    loads: AtomicU64,
}

impl CachingFilter {
    /// A zero capacity is raised to one entry.
    pub fn new(inner: SharedFilter<str>, capacity: usize, mode: CacheMode) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
            mode,
            requests: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            loads: AtomicU64::new(0),
        }
    }

    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    pub fn stats(&self) -> CacheStats {
        let cache = self.cache.lock();
        CacheStats {
            requests: self.requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            entries: cache.len(),
            capacity: cache.cap().get(),
        }
    }

    /// Cached decisions, most recently used first
    pub fn cached_entries(&self) -> Vec<Decision<String>> {
        self.cache.lock().iter().map(|(_, d)| d.clone()).collect()
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

impl DomainFilter<str> for CachingFilter {
    fn is_blocked(&self, value: &str) -> DecisionFor<str> {
        self.requests.fetch_add(1, Ordering::Relaxed);

        let cached = self.cache.lock().get(value).cloned();
        if let Some(decision) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return decision;
        }

        self.loads.fetch_add(1, Ordering::Relaxed);
        let decision = self.inner.is_blocked(value);
        if self.mode.admits(decision.blocked) {
            self.cache.lock().put(value.to_string(), decision.clone());
        }
        decision
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn domains(&self) -> Result<Domains<'_, String>, FilterError> {
        self.inner.domains()
    }

    fn name(&self) -> String {
        format!("cache({}, {:?})", self.inner.name(), self.mode)
    }

    fn child_filters(&self) -> Vec<FilterNode> {
        vec![FilterNode::Domain(self.inner.clone())]
    }
}
