//! Cached artifact descriptions

use serde::{Deserialize, Serialize};
use shared_types::{CachedFilterKey, FilterFormat};

/// One stored filter artifact as recorded in the index.
///
/// File names are relative to the cache root, e.g. `lists/5-v3.bloom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedFileFilter {
    pub key: CachedFilterKey,
    pub bloom_filter_file_name: String,
    /// Absent for bloom-only artifacts
    pub file_filter_file_name: Option<String>,
    pub format: FilterFormat,
    /// Superseded or orphaned; files are removed on the next sweep
    pub deleted: bool,
}

impl CachedFileFilter {
    pub fn new(
        key: CachedFilterKey,
        format: FilterFormat,
        bloom_filter_file_name: impl Into<String>,
        file_filter_file_name: Option<String>,
    ) -> Self {
        Self {
            key,
            bloom_filter_file_name: bloom_filter_file_name.into(),
            file_filter_file_name,
            format,
            deleted: false,
        }
    }

    /// Every file this artifact owns
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.bloom_filter_file_name.as_str())
            .chain(self.file_filter_file_name.as_deref())
    }
}
