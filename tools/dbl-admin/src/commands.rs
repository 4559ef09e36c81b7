//! Command implementations
//!
//! Input lists are newline-delimited. Surrounding whitespace is trimmed and
//! everything after a `#` is a comment.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use dbl_01_domain_filters::domain::hash_functions::digest;
use dbl_01_domain_filters::filters::{self, build_bloom, write_bloom_file};
use dbl_01_domain_filters::{
    BloomDomainFilter, DomainFilter, FilterError, HashFileFilter, SharedFilter, StringFileFilter,
};
use dbl_02_filter_cache::FilterCache;
use dbl_03_blacklist_service::{
    BlacklistConfig, DomainBlacklistService, FilterRegistryApi, UpdateSummary,
};
use shared_types::{BlacklistSource, CachedFilterKey, FilterFormat, HashAlgorithm};
use tracing::info;

fn normalize(line: &str) -> &str {
    line.split('#').next().unwrap_or_default().trim()
}

fn read_entries(
    input: &Path,
) -> Result<impl Iterator<Item = Result<String, FilterError>>, FilterError> {
    let file = File::open(input)?;
    Ok(BufReader::new(file)
        .lines()
        .map(|line| line.map(|l| normalize(&l).to_string()).map_err(FilterError::from)))
}

fn write_bloom<T>(filter: &dyn DomainFilter<T>, path: &Path, fpp: f64) -> anyhow::Result<()>
where
    T: dbl_01_domain_filters::FilterValue + ?Sized,
{
    let bloom = build_bloom(filter, fpp)?;
    write_bloom_file(path, &bloom)?;
    info!(
        path = %path.display(),
        size_bits = bloom.size_bits(),
        hash_count = bloom.hash_count(),
        "Wrote bloom file"
    );
    Ok(())
}

pub fn build_string(
    input: &Path,
    output: &Path,
    id: i32,
    name: &str,
    bloom: Option<&Path>,
    fpp: f64,
) -> anyhow::Result<()> {
    let filter = StringFileFilter::write(output, id, name, || read_entries(input))
        .with_context(|| format!("building {}", output.display()))?;
    info!(
        path = %output.display(),
        entries = filter.size(),
        buckets = filter.bucket_count(),
        "Wrote string file"
    );

    if let Some(path) = bloom {
        write_bloom::<str>(&filter, path, fpp)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn build_hash(
    input: &Path,
    output: &Path,
    id: i32,
    name: &str,
    algorithm: HashAlgorithm,
    prehashed: bool,
    bloom: Option<&Path>,
    fpp: f64,
) -> anyhow::Result<()> {
    let digests = || -> Result<_, FilterError> {
        Ok(read_entries(input)?
            .filter(|line| !matches!(line, Ok(line) if line.is_empty()))
            .map(move |line| {
                let line = line?;
                if prehashed {
                    hex::decode(&line).map_err(|e| {
                        FilterError::InvalidEntry(format!("invalid hex digest {line:?}: {e}"))
                    })
                } else {
                    Ok(digest(algorithm, line.as_bytes()))
                }
            }))
    };
    let filter = HashFileFilter::write(output, id, name, algorithm, digests)
        .with_context(|| format!("building {}", output.display()))?;
    info!(
        path = %output.display(),
        entries = filter.size(),
        buckets = filter.bucket_count(),
        %algorithm,
        "Wrote hash file"
    );

    if let Some(path) = bloom {
        write_bloom::<[u8]>(&filter, path, fpp)?;
    }
    Ok(())
}

/// Open a filter file as a domain filter.
pub fn open_filter(
    file: &Path,
    format: FilterFormat,
    bloom: Option<&Path>,
    hostname: bool,
) -> anyhow::Result<SharedFilter<str>> {
    let filter: SharedFilter<str> = match format.hash_algorithm() {
        Some(algorithm) => {
            let mut inner: SharedFilter<[u8]> = Arc::new(HashFileFilter::open(file)?);
            if let Some(path) = bloom {
                inner = Arc::new(BloomDomainFilter::load(path, inner)?);
            }
            filters::hashing(algorithm, inner)
        }
        None => {
            let mut inner: SharedFilter<str> = Arc::new(StringFileFilter::open(file)?);
            if let Some(path) = bloom {
                inner = Arc::new(BloomDomainFilter::load(path, inner)?);
            }
            inner
        }
    };

    Ok(if hostname {
        filters::hostname(filter)
    } else {
        filter
    })
}

/// One tab-separated line per domain: value, verdict, list id, origin.
pub fn query(filter: &dyn DomainFilter<str>, domains: &[String]) -> Vec<String> {
    domains
        .iter()
        .map(|domain| {
            let decision = filter.is_blocked(domain);
            let list = decision
                .list_id()
                .map_or_else(|| "-".to_string(), |id| id.to_string());
            format!(
                "{}\t{}\t{}\t{}",
                decision.value,
                if decision.blocked { "blocked" } else { "passed" },
                list,
                decision.origin.name()
            )
        })
        .collect()
}

pub fn cache_index_json(dir: &Path) -> anyhow::Result<String> {
    let cache = FilterCache::open(dir)?;
    Ok(serde_json::to_string_pretty(&cache.index())?)
}

pub fn cache_sweep(dir: &Path) -> anyhow::Result<Vec<CachedFilterKey>> {
    let cache = FilterCache::open(dir)?;
    Ok(cache.delete_marked_filters()?)
}

/// Run one update cycle and stop the service again.
pub async fn update(dir: &Path, sources: &Path, fpp: f64) -> anyhow::Result<UpdateSummary> {
    let raw = fs::read(sources).with_context(|| format!("reading {}", sources.display()))?;
    let sources: Vec<BlacklistSource> =
        serde_json::from_slice(&raw).context("parsing list descriptions")?;

    let config = BlacklistConfig::default()
        .with_cache_dir(dir)
        .with_bloom_fpp(fpp);
    let service = DomainBlacklistService::start(config)?;
    let result = service.set_filters(sources).wait().await;
    service.shutdown().await?;
    Ok(result?)
}
