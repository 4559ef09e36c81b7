//! # Index Migration
//!
//! Older index layouts are upgraded in place:
//!
//! - format 1 entries carry neither `deleted` nor `format`
//! - format 2 entries carry no `format`
//!
//! A missing format is inferred from the files on disk: an entry whose
//! storage file exists is a string list, anything else is bloom-only.
//! Entries stored under `profiles/` belong to a layout that no longer
//! exists and are dropped together with their files.

use std::collections::BTreeMap;

use serde::Deserialize;
use shared_types::{CachedFilterKey, FilterFormat, ListId};

use super::entities::CachedFileFilter;
use super::index::{CacheIndex, CURRENT_INDEX_FORMAT};

/// Directory of the obsolete per-profile artifacts
pub const PROFILES_DIR: &str = "profiles";

#[derive(Debug, Deserialize)]
struct RawIndex {
    format: Option<u32>,
    #[serde(default)]
    filters: BTreeMap<ListId, Vec<RawEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    key: CachedFilterKey,
    bloom_filter_file_name: String,
    #[serde(default)]
    file_filter_file_name: Option<String>,
    #[serde(default)]
    format: Option<FilterFormat>,
    #[serde(default)]
    deleted: Option<bool>,
}

/// Outcome of reading an index file
#[derive(Debug)]
pub enum IndexLoad {
    Current(CacheIndex),
    Upgraded {
        index: CacheIndex,
        from_format: u32,
        /// Files of dropped entries, relative to the cache root
        obsolete_files: Vec<String>,
    },
    /// The cache must be treated as empty
    Unusable(String),
}

fn is_profile_file(name: &str) -> bool {
    name.starts_with(&format!("{PROFILES_DIR}/"))
}

/// Interpret index bytes; `storage_exists` answers for a root-relative file name.
pub fn load_index(bytes: &[u8], storage_exists: impl Fn(&str) -> bool) -> IndexLoad {
    let raw: RawIndex = match serde_json::from_slice(bytes) {
        Ok(raw) => raw,
        Err(e) => return IndexLoad::Unusable(format!("unparsable index: {e}")),
    };

    let from_format = match raw.format {
        Some(format) if (1..=CURRENT_INDEX_FORMAT).contains(&format) => format,
        Some(format) => return IndexLoad::Unusable(format!("unsupported index format {format}")),
        None => return IndexLoad::Unusable("index has no format".into()),
    };

    let mut index = CacheIndex::new();
    let mut obsolete_files = Vec::new();

    for entry in raw.filters.into_values().flatten() {
        if from_format == CURRENT_INDEX_FORMAT {
            let (Some(format), Some(deleted)) = (entry.format, entry.deleted) else {
                return IndexLoad::Unusable(format!("incomplete entry for {}", entry.key));
            };
            index.insert(CachedFileFilter {
                key: entry.key,
                bloom_filter_file_name: entry.bloom_filter_file_name,
                file_filter_file_name: entry.file_filter_file_name,
                format,
                deleted,
            });
            continue;
        }

        let in_profiles = is_profile_file(&entry.bloom_filter_file_name)
            || entry.file_filter_file_name.as_deref().is_some_and(is_profile_file);
        if in_profiles {
            obsolete_files.push(entry.bloom_filter_file_name);
            obsolete_files.extend(entry.file_filter_file_name);
            continue;
        }

        let storage = entry
            .file_filter_file_name
            .filter(|name| storage_exists(name.as_str()));
        let format = entry.format.unwrap_or(if storage.is_some() {
            FilterFormat::String
        } else {
            FilterFormat::Bloom
        });
        index.insert(CachedFileFilter {
            key: entry.key,
            bloom_filter_file_name: entry.bloom_filter_file_name,
            file_filter_file_name: storage,
            format,
            deleted: entry.deleted.unwrap_or(false),
        });
    }

    if from_format == CURRENT_INDEX_FORMAT {
        IndexLoad::Current(index)
    } else {
        IndexLoad::Upgraded {
            index,
            from_format,
            obsolete_files,
        }
    }
}
