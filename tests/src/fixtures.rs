//! Shared fixtures: a temp directory holding source lists and a cache.

use std::fs;
use std::path::{Path, PathBuf};

use dbl_01_domain_filters::domain::hash_functions::digest;
use dbl_01_domain_filters::filters::write_bloom_file;
use dbl_01_domain_filters::{BloomFilter, HashFileFilter, StringFileFilter};
use dbl_03_blacklist_service::BlacklistConfig;
use shared_types::{BlacklistSource, HashAlgorithm, ListId, Version};
use tempfile::TempDir;

pub struct Workspace {
    dir: TempDir,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    pub fn config(&self) -> BlacklistConfig {
        BlacklistConfig::default()
            .with_cache_dir(self.cache_dir())
            .with_bloom_fpp(0.001)
    }

    /// Write a string file for list `id` and return its path.
    pub fn string_file(&self, id: ListId, version: Version, entries: &[&str]) -> PathBuf {
        let path = self.dir.path().join(format!("string-{id}-{version}.filter"));
        StringFileFilter::from_entries(&path, id, &format!("list-{id}"), entries)
            .expect("write string file");
        path
    }

    pub fn string_list(&self, id: ListId, version: Version, entries: &[&str]) -> BlacklistSource {
        BlacklistSource::new(id, "domainblacklist/string", version)
            .with_storage_file(self.string_file(id, version, entries))
    }

    /// Digest list built from domain names.
    pub fn hash_list(
        &self,
        id: ListId,
        version: Version,
        algorithm: HashAlgorithm,
        domains: &[&str],
    ) -> BlacklistSource {
        let path = self.dir.path().join(format!("hash-{id}-{version}.filter"));
        let digests: Vec<Vec<u8>> = domains
            .iter()
            .map(|d| digest(algorithm, d.as_bytes()))
            .collect();
        HashFileFilter::from_digests(&path, id, &format!("hashes-{id}"), algorithm, &digests)
            .expect("write hash file");
        let tag = match algorithm {
            HashAlgorithm::Md5 => "domainblacklist/hash-md5",
            HashAlgorithm::Sha1 => "domainblacklist/hash-sha1",
        };
        BlacklistSource::new(id, tag, version).with_storage_file(path)
    }

    /// Bloom-only list whose bloom file holds `domains`.
    pub fn bloom_list(&self, id: ListId, version: Version, domains: &[&str]) -> BlacklistSource {
        let path = self.dir.path().join(format!("bloom-{id}-{version}.bloom"));
        let mut bloom = BloomFilter::new_with_fpr(domains.len(), 0.001).expect("bloom params");
        for domain in domains {
            bloom.insert(domain.as_bytes());
        }
        write_bloom_file(&path, &bloom).expect("write bloom file");
        BlacklistSource::new(id, "domainblacklist/bloom", version).with_bloom_file(path)
    }

    /// Files currently under `lists/`, sorted
    pub fn cached_files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.cache_dir().join("lists"))
            .map(|dir| {
                dir.filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}
