//! Turns cached artifacts into filter objects

use std::path::Path;
use std::sync::Arc;

use dbl_01_domain_filters::filters::{build_bloom, write_bloom_file};
use dbl_01_domain_filters::{
    BloomDomainFilter, DomainFilter, FilterError, FilterNode, HashFileFilter, SharedFilter,
    StaticFilter, StringFileFilter,
};
use dbl_02_filter_cache::{CachedFileFilter, FilterCache};
use shared_types::FilterFormat;
use tempfile::TempPath;

/// Open the files of `entry` and wrap them in a bloom pre-filter.
///
/// Bloom-only artifacts sit on a constant "not blocked" filter that carries
/// the list id, so only bloom negatives are authoritative for them.
pub fn load_filter(cache: &FilterCache, entry: &CachedFileFilter) -> Result<FilterNode, FilterError> {
    let bloom_path = cache.resolve(&entry.bloom_filter_file_name);
    let id = entry.key.id;

    if let Some(algorithm) = entry.format.hash_algorithm() {
        let file = HashFileFilter::open(&storage_path(cache, entry)?)?;
        if file.algorithm() != algorithm {
            return Err(FilterError::Corrupt {
                kind: "hash",
                reason: format!(
                    "artifact {} is indexed as {} but the file holds {} digests",
                    entry.key,
                    entry.format,
                    file.algorithm()
                ),
            });
        }
        let inner: SharedFilter<[u8]> = Arc::new(file);
        let filter = BloomDomainFilter::load(&bloom_path, inner)?;
        return Ok(FilterNode::Hash(Arc::new(filter)));
    }

    let inner: SharedFilter<str> = match entry.format {
        FilterFormat::String => Arc::new(StringFileFilter::open(&storage_path(cache, entry)?)?),
        _ => Arc::new(StaticFilter::<str>::with_list_id(false, Some(id))),
    };
    let filter = BloomDomainFilter::load(&bloom_path, inner)?;
    Ok(FilterNode::Domain(Arc::new(filter)))
}

fn storage_path(
    cache: &FilterCache,
    entry: &CachedFileFilter,
) -> Result<std::path::PathBuf, FilterError> {
    entry
        .file_filter_file_name
        .as_deref()
        .map(|name| cache.resolve(name))
        .ok_or_else(|| FilterError::Corrupt {
            kind: "index",
            reason: format!("artifact {} has no storage file", entry.key),
        })
}

/// Build a bloom file for a storage file that arrived without one.
///
/// The file lives in the system temp directory and is removed when the
/// returned path is dropped.
pub fn generate_bloom_file(
    format: FilterFormat,
    storage: &Path,
    false_positive_rate: f64,
) -> Result<TempPath, FilterError> {
    let bloom = match format.hash_algorithm() {
        Some(_) => {
            let file = HashFileFilter::open(storage)?;
            build_bloom::<[u8]>(&file as &dyn DomainFilter<[u8]>, false_positive_rate)?
        }
        None => {
            let file = StringFileFilter::open(storage)?;
            build_bloom::<str>(&file as &dyn DomainFilter<str>, false_positive_rate)?
        }
    };

    let path = tempfile::Builder::new()
        .prefix("dbl-")
        .suffix(".bloom")
        .tempfile()?
        .into_temp_path();
    write_bloom_file(&path, &bloom)?;
    Ok(path)
}
