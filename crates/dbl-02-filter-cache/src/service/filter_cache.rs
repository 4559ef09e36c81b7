//! # Filter Cache
//!
//! Owns `lists/`, `profiles/` and `index.json` under the cache root and
//! mediates every artifact lifecycle transition.
//!
//! ## Mutation Protocol
//!
//! Every mutation runs under the update mutex: clone the index, change
//! the clone, persist it atomically, then publish it. Readers always see
//! a complete index, old or new.
//!
//! ## Deletion
//!
//! Marking and sweeping are separate steps. Files of an artifact marked
//! in one update cycle are only removed by a later sweep, so filters
//! already handed out keep working until they are replaced.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use shared_types::{CachedFilterKey, FilterFormat, ListId, Version};
use tracing::{debug, info, warn};

use crate::adapters::files;
use crate::adapters::CacheLock;
use crate::domain::{load_index, CacheIndex, CachedFileFilter, IndexLoad, PROFILES_DIR};
use crate::error::{CacheError, IoContext};

pub const LISTS_DIR: &str = "lists";
pub const INDEX_FILE: &str = "index.json";

pub struct FilterCache {
    root: PathBuf,
    index: RwLock<CacheIndex>,
    update: Mutex<()>,
    lock: CacheLock,
}

impl FilterCache {
    /// Open or initialise a cache directory.
    ///
    /// A missing or unusable index leaves an empty cache and wipes both
    /// managed directories. An index in an older format is upgraded.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        for dir in [root.clone(), root.join(LISTS_DIR), root.join(PROFILES_DIR)] {
            fs::create_dir_all(&dir).at(&dir)?;
        }
        let lock = CacheLock::acquire(&root)?;

        let index_path = root.join(INDEX_FILE);
        let loaded = match fs::read(&index_path) {
            Ok(bytes) => Some(load_index(&bytes, |name| root.join(name).is_file())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(CacheError::io(&index_path, e)),
        };

        let index = match loaded {
            Some(IndexLoad::Current(index)) => index,
            Some(IndexLoad::Upgraded {
                index,
                from_format,
                obsolete_files,
            }) => {
                for name in &obsolete_files {
                    files::remove_quietly(&root.join(name))?;
                }
                files::wipe_dir(&root.join(PROFILES_DIR))?;
                info!(
                    from_format,
                    to_format = index.format,
                    artifacts = index.len(),
                    dropped_files = obsolete_files.len(),
                    "Upgraded filter cache index"
                );
                Self::write_index(&root, &index)?;
                index
            }
            Some(IndexLoad::Unusable(reason)) => {
                warn!(path = %index_path.display(), %reason, "Discarding filter cache");
                Self::reset(&root)?
            }
            None => {
                debug!(root = %root.display(), "No filter cache index, starting empty");
                Self::reset(&root)?
            }
        };

        info!(
            root = %root.display(),
            artifacts = index.len(),
            lists = index.filters.len(),
            "Opened filter cache"
        );

        Ok(Self {
            root,
            index: RwLock::new(index),
            update: Mutex::new(()),
            lock,
        })
    }

    fn reset(root: &Path) -> Result<CacheIndex, CacheError> {
        let lists = files::wipe_dir(&root.join(LISTS_DIR))?;
        let profiles = files::wipe_dir(&root.join(PROFILES_DIR))?;
        if lists + profiles > 0 {
            info!(removed = lists + profiles, "Removed stale cache files");
        }
        let index = CacheIndex::new();
        Self::write_index(root, &index)?;
        Ok(index)
    }

    fn write_index(root: &Path, index: &CacheIndex) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec_pretty(index)?;
        files::write_atomic(&root.join(INDEX_FILE), &bytes)
    }

    /// Apply `change` to a copy of the index; persist and publish it if it changed.
    fn update<R>(&self, change: impl FnOnce(&mut CacheIndex) -> R) -> Result<R, CacheError> {
        let _serialized = self.update.lock();
        let mut next = self.index.read().clone();
        let result = change(&mut next);
        if next != *self.index.read() {
            Self::write_index(&self.root, &next)?;
            *self.index.write() = next;
        }
        Ok(result)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn lock_path(&self) -> &Path {
        self.lock.path()
    }

    /// Absolute path of a file named in the index
    pub fn resolve(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Snapshot of the whole index
    pub fn index(&self) -> CacheIndex {
        self.index.read().clone()
    }

    pub fn file_filters(&self) -> Vec<CachedFileFilter> {
        self.index.read().entries().cloned().collect()
    }

    /// Artifacts of one list, newest first
    pub fn file_filters_by_id(&self, id: ListId) -> Vec<CachedFileFilter> {
        self.index.read().by_id(id).to_vec()
    }

    pub fn latest_file_filter_by_id(&self, id: ListId) -> Option<CachedFileFilter> {
        self.index.read().latest(id).cloned()
    }

    pub fn file_filter(&self, key: &CachedFilterKey) -> Option<CachedFileFilter> {
        self.index.read().get(key).cloned()
    }

    /// Copy source files into `lists/` under `{id}-v{version}` names and
    /// record the artifact.
    pub fn store_file_filter(
        &self,
        id: ListId,
        version: Version,
        format: FilterFormat,
        storage_file: Option<&Path>,
        bloom_file: &Path,
    ) -> Result<CachedFileFilter, CacheError> {
        let key = CachedFilterKey::new(id, version);
        let storage_file = if format.has_storage_file() {
            Some(storage_file.ok_or(CacheError::MissingStorageFile { key })?)
        } else {
            None
        };

        let bloom_name = format!("{LISTS_DIR}/{key}.bloom");
        files::copy_atomic(bloom_file, &self.resolve(&bloom_name))?;

        let storage_name = match storage_file {
            Some(source) => {
                let name = format!("{LISTS_DIR}/{key}.filter");
                files::copy_atomic(source, &self.resolve(&name))?;
                Some(name)
            }
            None => None,
        };

        let entry = CachedFileFilter::new(key, format, bloom_name, storage_name);
        self.update(|index| index.insert(entry.clone()))?;
        info!(list_id = id, version, %format, "Stored filter artifact");
        Ok(entry)
    }

    /// Returns whether the artifact was live before
    pub fn mark_deleted(&self, key: &CachedFilterKey) -> Result<bool, CacheError> {
        self.update(|index| index.mark(key))
    }

    pub fn mark_old_versions_as_deleted(&self) -> Result<Vec<CachedFilterKey>, CacheError> {
        let marked = self.update(CacheIndex::mark_old_versions)?;
        if !marked.is_empty() {
            debug!(count = marked.len(), "Marked superseded artifacts as deleted");
        }
        Ok(marked)
    }

    pub fn mark_non_existing_filters_as_deleted(
        &self,
        live_ids: &HashSet<ListId>,
    ) -> Result<Vec<CachedFilterKey>, CacheError> {
        let marked = self.update(|index| index.mark_absent(live_ids))?;
        if !marked.is_empty() {
            debug!(count = marked.len(), "Marked orphaned artifacts as deleted");
        }
        Ok(marked)
    }

    /// Remove files and index entries of every marked artifact.
    ///
    /// Returns the removed keys so callers can drop filters built on them.
    pub fn delete_marked_filters(&self) -> Result<Vec<CachedFilterKey>, CacheError> {
        let marked = self.index.read().marked();
        if marked.is_empty() {
            return Ok(Vec::new());
        }

        for entry in &marked {
            for name in entry.file_names() {
                files::remove_quietly(&self.resolve(name))?;
            }
        }

        let removed = self.update(|index| {
            marked
                .iter()
                .filter_map(|entry| index.remove(&entry.key).map(|e| e.key))
                .collect::<Vec<_>>()
        })?;
        info!(count = removed.len(), "Deleted marked filter artifacts");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    struct Sources {
        dir: TempDir,
    }

    impl Sources {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn file(&self, name: &str, content: &[u8]) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, content).unwrap();
            path
        }
    }

    fn store_bloom(cache: &FilterCache, src: &Sources, id: ListId, version: Version) {
        let bloom = src.file("src.bloom", format!("bloom {id} {version}").as_bytes());
        cache
            .store_file_filter(id, version, FilterFormat::Bloom, None, &bloom)
            .unwrap();
    }

    #[test]
    fn test_store_copies_files_under_key_names() {
        let root = TempDir::new().unwrap();
        let src = Sources::new();
        let cache = FilterCache::open(root.path()).unwrap();

        let storage = src.file("list.filter", b"storage");
        let bloom = src.file("list.bloom", b"bloom");
        let entry = cache
            .store_file_filter(5, 3, FilterFormat::String, Some(&storage), &bloom)
            .unwrap();

        assert_eq!(entry.bloom_filter_file_name, "lists/5-v3.bloom");
        assert_eq!(entry.file_filter_file_name.as_deref(), Some("lists/5-v3.filter"));
        assert_eq!(fs::read(cache.resolve("lists/5-v3.filter")).unwrap(), b"storage");
        assert_eq!(fs::read(cache.resolve("lists/5-v3.bloom")).unwrap(), b"bloom");
        assert_eq!(cache.latest_file_filter_by_id(5), Some(entry));
    }

    #[test]
    fn test_string_format_requires_storage_file() {
        let root = TempDir::new().unwrap();
        let src = Sources::new();
        let cache = FilterCache::open(root.path()).unwrap();
        let bloom = src.file("list.bloom", b"bloom");

        let err = cache
            .store_file_filter(1, 1, FilterFormat::HashMd5, None, &bloom)
            .unwrap_err();
        assert!(matches!(err, CacheError::MissingStorageFile { .. }));
    }

    #[test]
    fn test_latest_version_in_either_insert_order() {
        for order in [[2, 3], [3, 2]] {
            let root = TempDir::new().unwrap();
            let src = Sources::new();
            let cache = FilterCache::open(root.path()).unwrap();
            for version in order {
                store_bloom(&cache, &src, 5, version);
            }
            assert_eq!(cache.latest_file_filter_by_id(5).unwrap().key.version, 3);

            assert!(cache.mark_deleted(&CachedFilterKey::new(5, 2)).unwrap());
            let removed = cache.delete_marked_filters().unwrap();
            assert_eq!(removed, vec![CachedFilterKey::new(5, 2)]);

            let versions: Vec<_> = cache.file_filters_by_id(5).iter().map(|e| e.key.version).collect();
            assert_eq!(versions, vec![3]);
            assert!(!cache.resolve("lists/5-v2.bloom").exists());
            assert!(cache.resolve("lists/5-v3.bloom").exists());
        }
    }

    #[test]
    fn test_marking_is_deferred_until_sweep() {
        let root = TempDir::new().unwrap();
        let src = Sources::new();
        let cache = FilterCache::open(root.path()).unwrap();
        store_bloom(&cache, &src, 1, 1);
        store_bloom(&cache, &src, 1, 2);
        store_bloom(&cache, &src, 2, 1);

        assert_eq!(cache.mark_old_versions_as_deleted().unwrap(), vec![CachedFilterKey::new(1, 1)]);
        assert_eq!(
            cache.mark_non_existing_filters_as_deleted(&HashSet::from([1])).unwrap(),
            vec![CachedFilterKey::new(2, 1)]
        );
        assert!(cache.resolve("lists/1-v1.bloom").exists(), "files stay until swept");
        assert!(cache.resolve("lists/2-v1.bloom").exists());

        let mut removed = cache.delete_marked_filters().unwrap();
        removed.sort();
        assert_eq!(removed, vec![CachedFilterKey::new(1, 1), CachedFilterKey::new(2, 1)]);
        assert!(!cache.resolve("lists/1-v1.bloom").exists());
        assert!(!cache.resolve("lists/2-v1.bloom").exists());
        assert_eq!(cache.file_filters().len(), 1);
        assert!(cache.delete_marked_filters().unwrap().is_empty());
    }

    #[test]
    fn test_index_survives_reopen() {
        let root = TempDir::new().unwrap();
        let src = Sources::new();
        {
            let cache = FilterCache::open(root.path()).unwrap();
            store_bloom(&cache, &src, 9, 100);
            cache.mark_deleted(&CachedFilterKey::new(9, 100)).unwrap();
        }

        let cache = FilterCache::open(root.path()).unwrap();
        let entry = cache.file_filter(&CachedFilterKey::new(9, 100)).unwrap();
        assert!(entry.deleted);
        assert!(cache.latest_file_filter_by_id(9).is_none());
    }

    #[test]
    fn test_second_open_is_locked() {
        let root = TempDir::new().unwrap();
        let _cache = FilterCache::open(root.path()).unwrap();
        assert!(matches!(
            FilterCache::open(root.path()),
            Err(CacheError::Locked { .. })
        ));
    }

    #[test]
    fn test_missing_or_broken_index_wipes_directories() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("lists")).unwrap();
        fs::create_dir_all(root.path().join("profiles")).unwrap();
        fs::write(root.path().join("lists/stale.bloom"), b"x").unwrap();
        fs::write(root.path().join("profiles/stale.bloom"), b"x").unwrap();

        drop(FilterCache::open(root.path()).unwrap());
        assert_eq!(fs::read_dir(root.path().join("lists")).unwrap().count(), 0);
        assert_eq!(fs::read_dir(root.path().join("profiles")).unwrap().count(), 0);

        fs::write(root.path().join("lists/again.bloom"), b"x").unwrap();
        fs::write(root.path().join(INDEX_FILE), b"{ not json").unwrap();
        let cache = FilterCache::open(root.path()).unwrap();
        assert!(cache.file_filters().is_empty());
        assert_eq!(fs::read_dir(root.path().join("lists")).unwrap().count(), 0);
    }

    #[test]
    fn test_old_index_is_upgraded_on_open() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("lists")).unwrap();
        fs::create_dir_all(root.path().join("profiles")).unwrap();
        fs::write(root.path().join("lists/1-v5.bloom"), b"b").unwrap();
        fs::write(root.path().join("lists/1-v5.filter"), b"f").unwrap();
        fs::write(root.path().join("lists/2-v5.bloom"), b"b").unwrap();
        fs::write(root.path().join("profiles/-1-v5.bloom"), b"p").unwrap();
        fs::write(root.path().join("profiles/other"), b"p").unwrap();
        fs::write(
            root.path().join(INDEX_FILE),
            br#"{"format":1,"filters":{
                "1":[{"key":{"id":1,"version":5},"bloomFilterFileName":"lists/1-v5.bloom","fileFilterFileName":"lists/1-v5.filter"}],
                "2":[{"key":{"id":2,"version":5},"bloomFilterFileName":"lists/2-v5.bloom","fileFilterFileName":null}],
                "-1":[{"key":{"id":-1,"version":5},"bloomFilterFileName":"profiles/-1-v5.bloom","fileFilterFileName":null}]}}"#,
        )
        .unwrap();

        let cache = FilterCache::open(root.path()).unwrap();

        assert_eq!(cache.latest_file_filter_by_id(1).unwrap().format, FilterFormat::String);
        assert_eq!(cache.latest_file_filter_by_id(2).unwrap().format, FilterFormat::Bloom);
        assert!(cache.latest_file_filter_by_id(-1).is_none());
        assert_eq!(fs::read_dir(root.path().join("profiles")).unwrap().count(), 0);
        assert!(root.path().join("lists/1-v5.filter").exists());

        let persisted: serde_json::Value =
            serde_json::from_slice(&fs::read(root.path().join(INDEX_FILE)).unwrap()).unwrap();
        assert_eq!(persisted["format"], 3);
    }
}
