//! # Domain Filter Benchmarks
//!
//! | Path | Expectation |
//! |------|-------------|
//! | bloom negative | no file access |
//! | string file hit | one bucket read |
//! | hash file hit | one bucket read plus binary search |
//! | cached lookup | LRU hit, no inner call |

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dbl_01_domain_filters::domain::hash_functions::digest;
use dbl_01_domain_filters::filters::{self, CacheMode};
use dbl_01_domain_filters::{
    BloomDomainFilter, BloomFilter, DomainFilter, HashFileFilter, SharedFilter, StringFileFilter,
};
use rand::Rng;
use shared_types::HashAlgorithm;
use tempfile::TempDir;

fn domains(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("host{i}.example{}.test", i % 97)).collect()
}

// ============================================================================
// Bloom structure
// ============================================================================

fn bench_bloom_contains(c: &mut Criterion) {
    let mut group = c.benchmark_group("bloom");

    let entries = domains(100_000);
    let mut bloom = BloomFilter::new_with_fpr(entries.len(), 0.001).unwrap();
    for entry in &entries {
        bloom.insert(entry.as_bytes());
    }

    group.bench_function("contains_hit", |b| {
        b.iter(|| black_box(bloom.contains(entries[4_242].as_bytes())))
    });
    group.bench_function("contains_miss", |b| {
        b.iter(|| black_box(bloom.contains(b"absent.example.org")))
    });
    group.finish();
}

// ============================================================================
// File-backed lookups
// ============================================================================

fn bench_string_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("string-file");
    group.measurement_time(Duration::from_secs(5));
    let dir = TempDir::new().unwrap();

    for size in [1_000usize, 100_000] {
        let entries = domains(size);
        let path = dir.path().join(format!("list-{size}.filter"));
        let file: SharedFilter<str> =
            Arc::new(StringFileFilter::from_entries(&path, 1, "bench", &entries).unwrap());
        let fronted = BloomDomainFilter::<str>::new(file.clone(), 0.001).unwrap();

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("hit", size), &entries, |b, entries| {
            let mut rng = rand::thread_rng();
            b.iter(|| {
                let value = &entries[rng.gen_range(0..entries.len())];
                black_box(file.is_blocked(value).blocked)
            })
        });
        group.bench_with_input(BenchmarkId::new("miss", size), &size, |b, _| {
            b.iter(|| black_box(file.is_blocked("absent.example.org").blocked))
        });
        group.bench_with_input(BenchmarkId::new("bloom_miss", size), &size, |b, _| {
            b.iter(|| black_box(fronted.is_blocked("absent.example.org").blocked))
        });
    }
    group.finish();
}

fn bench_hash_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash-file");
    let dir = TempDir::new().unwrap();

    let entries = domains(100_000);
    let digests: Vec<Vec<u8>> = entries
        .iter()
        .map(|d| digest(HashAlgorithm::Md5, d.as_bytes()))
        .collect();
    let path = dir.path().join("hashes.filter");
    let file: SharedFilter<[u8]> = Arc::new(
        HashFileFilter::from_digests(&path, 2, "bench", HashAlgorithm::Md5, &digests).unwrap(),
    );
    let hashed = filters::hashing(HashAlgorithm::Md5, file);

    group.bench_function("hashed_hit", |b| {
        b.iter(|| black_box(hashed.is_blocked(&entries[777]).blocked))
    });
    group.bench_function("hashed_miss", |b| {
        b.iter(|| black_box(hashed.is_blocked("absent.example.org").blocked))
    });
    group.finish();
}

// ============================================================================
// Composition
// ============================================================================

fn bench_composed_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let dir = TempDir::new().unwrap();

    let lists: Vec<SharedFilter<str>> = (0..4)
        .map(|i| {
            let entries: Vec<String> = domains(10_000)
                .into_iter()
                .map(|d| format!(".l{i}{d}"))
                .collect();
            let path = dir.path().join(format!("list{i}.filter"));
            let file: SharedFilter<str> =
                Arc::new(StringFileFilter::from_entries(&path, i, "bench", &entries).unwrap());
            filters::bloom(file, 0.001).unwrap()
        })
        .collect();

    let uncached = filters::hostname(filters::or(lists.clone()));
    let cached = filters::caching(uncached.clone(), 1_024, CacheMode::All);
    let parallel = filters::hostname(filters::parallel_or(lists));

    let query = "www.sub.l2host42.example42.test";
    group.bench_function("hostname_or", |b| {
        b.iter(|| black_box(uncached.is_blocked(query).blocked))
    });
    group.bench_function("hostname_parallel_or", |b| {
        b.iter(|| black_box(parallel.is_blocked(query).blocked))
    });
    group.bench_function("cached", |b| {
        b.iter(|| black_box(cached.is_blocked(query).blocked))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_bloom_contains,
    bench_string_file,
    bench_hash_file,
    bench_composed_pipeline
);
criterion_main!(benches);
