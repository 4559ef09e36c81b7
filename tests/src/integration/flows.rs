//! # Update Flows
//!
//! Lists go through `DomainBlacklistService` the way a deployment drives
//! it: configuration snapshots are submitted, cycles run on the worker and
//! request handlers look filters up concurrently.

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use dbl_01_domain_filters::filters;
    use dbl_03_blacklist_service::{DomainBlacklistService, FilterRegistryApi};
    use shared_types::{CachedFilterKey, HashAlgorithm};

    use crate::fixtures::Workspace;

    // =========================================================================
    // IMPORT AND LOOKUP
    // =========================================================================

    #[tokio::test]
    async fn test_every_format_is_served_as_domain_filter() {
        let ws = Workspace::new();
        let service = DomainBlacklistService::start(ws.config()).unwrap();

        let summary = service
            .set_filters(vec![
                ws.string_list(1, 10, &["ads.example.com"]),
                ws.hash_list(2, 10, HashAlgorithm::Md5, &["malware.test"]),
                ws.hash_list(3, 10, HashAlgorithm::Sha1, &["phish.test"]),
                ws.bloom_list(4, 10, &["bloom.test"]),
            ])
            .wait()
            .await
            .unwrap();
        assert_eq!(summary.imported.len(), 4);

        let strings = service.get_domain_filter(1).unwrap();
        assert!(strings.is_blocked("ads.example.com").blocked);

        let md5 = service.get_domain_filter(2).unwrap();
        let decision = md5.is_blocked("malware.test");
        assert!(decision.blocked);
        assert_eq!(decision.value, "malware.test");
        assert_eq!(decision.list_id(), Some(2));

        let sha1 = service.get_domain_filter(3).unwrap();
        assert!(sha1.is_blocked("phish.test").blocked);
        assert!(!sha1.is_blocked("malware.test").blocked);

        // Bloom-only lists register but a bloom hit is never final
        let bloom_only = service.get_domain_filter(4).unwrap();
        assert!(!bloom_only.is_blocked("bloom.test").blocked);
        assert_eq!(service.get_filter(4).unwrap().list_id(), Some(4));

        assert!(service.get_filter(2).unwrap().as_hash().is_some());

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_hostname_lookup_over_cached_list() {
        let ws = Workspace::new();
        let service = DomainBlacklistService::start(ws.config()).unwrap();
        service
            .set_filters(vec![ws.string_list(1, 1, &[".tracker.net", "tracker.net"])])
            .wait()
            .await
            .unwrap();

        let filter = filters::hostname(service.get_domain_filter(1).unwrap());
        let decision = filter.is_blocked("a.b.tracker.net.");
        assert!(decision.blocked);
        assert_eq!(decision.value, "a.b.tracker.net.");
        assert!(filter.is_blocked("tracker.net").blocked);
        assert!(!filter.is_blocked("tracker.network").blocked);
        assert!(!filter.is_blocked("net").blocked);

        service.shutdown().await.unwrap();
    }

    // =========================================================================
    // VERSIONING
    // =========================================================================

    #[tokio::test]
    async fn test_versions_only_move_forward() {
        let ws = Workspace::new();
        let service = DomainBlacklistService::start(ws.config()).unwrap();

        let head = |service: &DomainBlacklistService| {
            service
                .registry()
                .cache()
                .latest_file_filter_by_id(1)
                .map(|e| e.key)
        };

        for (version, expected) in [(5, 5), (3, 5), (7, 7), (7, 7), (6, 7)] {
            service
                .set_filters(vec![ws.string_list(1, version, &["v.test"])])
                .wait()
                .await
                .unwrap();
            assert_eq!(head(&service), Some(CachedFilterKey::new(1, expected)));
        }

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_repeated_snapshot_is_a_no_op() {
        let ws = Workspace::new();
        let service = DomainBlacklistService::start(ws.config()).unwrap();
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();
        service.add_listener(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let snapshot = vec![
            ws.string_list(1, 1, &["a.test"]),
            ws.hash_list(2, 1, HashAlgorithm::Md5, &["b.test"]),
        ];
        service.set_filters(snapshot.clone()).wait().await.unwrap();
        let index_path = ws.cache_dir().join("index.json");
        let index_before = fs::read(&index_path).unwrap();
        let files_before = ws.cached_files();

        let summary = service.set_filters(snapshot).wait().await.unwrap();

        assert!(summary.imported.is_empty());
        assert!(summary.removed.is_empty());
        assert!(!summary.heads_changed);
        assert_eq!(fs::read(&index_path).unwrap(), index_before);
        assert_eq!(ws.cached_files(), files_before);
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_superseded_files_survive_one_cycle() {
        let ws = Workspace::new();
        let service = DomainBlacklistService::start(ws.config()).unwrap();

        service
            .set_filters(vec![ws.string_list(1, 1, &["old.test"])])
            .wait()
            .await
            .unwrap();
        let in_use = service.get_domain_filter(1).unwrap();

        service
            .set_filters(vec![ws.string_list(1, 2, &["new.test"])])
            .wait()
            .await
            .unwrap();

        // A handler still holding the old filter keeps working
        assert!(in_use.is_blocked("old.test").blocked);
        assert_eq!(ws.cached_files().len(), 4);

        let sweep = service
            .set_filters(vec![ws.string_list(1, 2, &["new.test"])])
            .wait()
            .await
            .unwrap();
        assert_eq!(sweep.removed, vec![CachedFilterKey::new(1, 1)]);
        assert_eq!(ws.cached_files(), vec!["1-v2.bloom", "1-v2.filter"]);

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_restart_resumes_from_cache() {
        let ws = Workspace::new();
        {
            let service = DomainBlacklistService::start(ws.config()).unwrap();
            service
                .set_filters(vec![
                    ws.string_list(1, 1, &["one.test"]),
                    ws.string_list(2, 1, &["two.test"]),
                ])
                .wait()
                .await
                .unwrap();
            // List 2 disappears from the configuration
            service
                .set_filters(vec![ws.string_list(1, 2, &["one.test"])])
                .wait()
                .await
                .unwrap();
            service.shutdown().await.unwrap();
        }

        let service = DomainBlacklistService::start(ws.config()).unwrap();
        assert!(service.get_filter(2).is_none());
        assert!(service.get_domain_filter(1).unwrap().is_blocked("one.test").blocked);
        assert_eq!(service.registry().loaded_count(), 1);

        let summary = service
            .set_filters(vec![ws.string_list(1, 2, &["one.test"])])
            .wait()
            .await
            .unwrap();
        let mut removed = summary.removed;
        removed.sort();
        assert_eq!(removed, vec![CachedFilterKey::new(1, 1), CachedFilterKey::new(2, 1)]);

        service.shutdown().await.unwrap();
    }

    // =========================================================================
    // CONCURRENCY
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lookups_during_updates_always_see_a_complete_filter() {
        let ws = Workspace::new();
        let service = Arc::new(DomainBlacklistService::start(ws.config()).unwrap());
        service
            .set_filters(vec![ws.string_list(1, 1, &["always.test", "v1.test"])])
            .wait()
            .await
            .unwrap();

        let reader = {
            let service = service.clone();
            std::thread::spawn(move || {
                let mut lookups = 0usize;
                for _ in 0..2_000 {
                    let filter = service.get_domain_filter(1).expect("list 1 is always present");
                    assert!(filter.is_blocked("always.test").blocked);
                    lookups += 1;
                }
                lookups
            })
        };

        for version in 2..6 {
            let marker = format!("v{version}.test");
            let entries = ["always.test", marker.as_str()];
            service
                .set_filters(vec![ws.string_list(1, version, &entries)])
                .wait()
                .await
                .unwrap();
        }

        assert_eq!(reader.join().unwrap(), 2_000);
        assert!(service.get_domain_filter(1).unwrap().is_blocked("v5.test").blocked);

        let service = Arc::try_unwrap(service).ok().expect("reader finished");
        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_second_service_on_same_cache_is_refused() {
        let ws = Workspace::new();
        let first = DomainBlacklistService::start(ws.config()).unwrap();
        assert!(DomainBlacklistService::start(ws.config()).is_err());
        first.shutdown().await.unwrap();
        let again = DomainBlacklistService::start(ws.config()).unwrap();
        again.shutdown().await.unwrap();
    }
}
