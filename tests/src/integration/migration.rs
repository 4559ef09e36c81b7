//! # Legacy Cache Upgrade
//!
//! A cache written by an older release is picked up by the service: the
//! index is upgraded, obsolete profile artifacts disappear and surviving
//! lists keep serving.

#[cfg(test)]
mod tests {
    use std::fs;

    use dbl_01_domain_filters::filters::write_bloom_file;
    use dbl_01_domain_filters::{BloomFilter, StringFileFilter};
    use dbl_02_filter_cache::CURRENT_INDEX_FORMAT;
    use dbl_03_blacklist_service::{DomainBlacklistService, FilterRegistryApi};
    use shared_types::{CachedFilterKey, FilterFormat};

    use crate::fixtures::Workspace;

    fn seed_legacy_cache(ws: &Workspace) {
        let root = ws.cache_dir();
        fs::create_dir_all(root.join("lists")).unwrap();
        fs::create_dir_all(root.join("profiles")).unwrap();

        StringFileFilter::from_entries(&root.join("lists/1-v5.filter"), 1, "legacy", &["old.test"])
            .unwrap();
        let mut bloom = BloomFilter::new_with_fpr(1, 0.001).unwrap();
        bloom.insert(b"old.test");
        write_bloom_file(&root.join("lists/1-v5.bloom"), &bloom).unwrap();
        write_bloom_file(&root.join("profiles/-3-v1.bloom"), &bloom).unwrap();

        let index = r#"{"format":2,"filters":{
            "1":[{"key":{"id":1,"version":5},"bloomFilterFileName":"lists/1-v5.bloom",
                  "fileFilterFileName":"lists/1-v5.filter","deleted":false}],
            "-3":[{"key":{"id":-3,"version":1},"bloomFilterFileName":"profiles/-3-v1.bloom",
                   "fileFilterFileName":null,"deleted":false}]}}"#;
        fs::write(root.join("index.json"), index).unwrap();
    }

    #[tokio::test]
    async fn test_legacy_cache_is_upgraded_and_served() {
        let ws = Workspace::new();
        seed_legacy_cache(&ws);

        let service = DomainBlacklistService::start(ws.config()).unwrap();

        let filter = service.get_domain_filter(1).unwrap();
        assert!(filter.is_blocked("old.test").blocked);
        assert!(service.get_filter(-3).is_none());

        let index = service.registry().cache().index();
        assert_eq!(index.format, CURRENT_INDEX_FORMAT);
        assert_eq!(index.latest(1).unwrap().format, FilterFormat::String);
        assert!(fs::read_dir(ws.cache_dir().join("profiles"))
            .map(|d| d.count() == 0)
            .unwrap_or(true));

        let persisted: serde_json::Value =
            serde_json::from_slice(&fs::read(ws.cache_dir().join("index.json")).unwrap()).unwrap();
        assert_eq!(persisted["format"], CURRENT_INDEX_FORMAT);

        // A newer configured version replaces the migrated artifact
        let summary = service
            .set_filters(vec![ws.string_list(1, 6, &["new.test"])])
            .wait()
            .await
            .unwrap();
        assert_eq!(summary.imported, vec![CachedFilterKey::new(1, 6)]);
        assert!(service.get_domain_filter(1).unwrap().is_blocked("new.test").blocked);

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unreadable_index_starts_empty() {
        let ws = Workspace::new();
        fs::create_dir_all(ws.cache_dir()).unwrap();
        fs::write(ws.cache_dir().join("index.json"), b"{ truncated").unwrap();

        let service = DomainBlacklistService::start(ws.config()).unwrap();
        assert!(service.registry().cache().index().is_empty());

        service
            .set_filters(vec![ws.string_list(2, 1, &["fresh.test"])])
            .wait()
            .await
            .unwrap();
        assert!(service.get_domain_filter(2).unwrap().is_blocked("fresh.test").blocked);

        service.shutdown().await.unwrap();
    }
}
