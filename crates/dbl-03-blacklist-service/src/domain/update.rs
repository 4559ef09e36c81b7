//! Update cycle outcome

use shared_types::{CachedFilterKey, ListId};

/// What one update cycle did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Artifacts stored and loaded in this cycle
    pub imported: Vec<CachedFilterKey>,
    /// Artifacts stored but unloadable; already marked deleted
    pub failed: Vec<CachedFilterKey>,
    /// Artifacts swept at the start of this cycle
    pub removed: Vec<CachedFilterKey>,
    /// Lists left alone because of a configuration problem
    pub skipped: Vec<ListId>,
    /// Whether the head version of any list changed; listeners are only
    /// notified when it did
    pub heads_changed: bool,
}
