//! # Composition Over File-Backed Filters
//!
//! Combinators and decorators applied to real string and hash files, the
//! way request pipelines assemble them.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use dbl_01_domain_filters::filters::{self, AttributeScope, CacheMode, CachingFilter};
    use dbl_01_domain_filters::{
        BloomDomainFilter, DomainFilter, FilterNode, HashFileFilter, SharedFilter,
        StringFileFilter,
    };
    use serde_json::json;
    use shared_types::HashAlgorithm;

    use crate::fixtures::Workspace;

    fn string_filter(ws: &Workspace, id: i32, entries: &[&str]) -> SharedFilter<str> {
        Arc::new(StringFileFilter::open(&ws.string_file(id, 1, entries)).unwrap())
    }

    #[test]
    fn test_or_of_lists_reports_the_blocking_list() {
        let ws = Workspace::new();
        let ads = string_filter(&ws, 1, &[".ads.test"]);
        let malware = string_filter(&ws, 2, &[".malware.test"]);
        let combined = filters::hostname(filters::or(vec![ads, malware]));

        assert_eq!(combined.is_blocked("x.ads.test").list_id(), Some(1));
        assert_eq!(combined.is_blocked("y.malware.test").list_id(), Some(2));
        assert!(!combined.is_blocked("clean.test").blocked);
    }

    #[test]
    fn test_parallel_or_agrees_with_or() {
        let ws = Workspace::new();
        let lists: Vec<SharedFilter<str>> = (0..8)
            .map(|i| string_filter(&ws, i, &[format!("host{i}.test").as_str()]))
            .collect();
        let sequential = filters::or(lists.clone());
        let parallel = filters::parallel_or(lists);

        for i in 0..10 {
            let host = format!("host{i}.test");
            assert_eq!(
                sequential.is_blocked(&host).blocked,
                parallel.is_blocked(&host).blocked,
                "{host}"
            );
        }
        assert_eq!(parallel.size(), 8);
    }

    #[test]
    fn test_allow_list_overrides_block_list() {
        let ws = Workspace::new();
        let blocked = string_filter(&ws, 1, &["shop.test", "cdn.shop.test", "evil.test"]);
        let allowed = string_filter(&ws, 2, &["cdn.shop.test"]);
        let policy = filters::and(vec![blocked, filters::not(allowed)]);

        assert!(policy.is_blocked("shop.test").blocked);
        assert!(policy.is_blocked("evil.test").blocked);
        assert!(!policy.is_blocked("cdn.shop.test").blocked);
        assert!(!policy.is_blocked("other.test").blocked);
    }

    #[test]
    fn test_replace_normalizes_before_lookup() {
        let ws = Workspace::new();
        let list = string_filter(&ws, 1, &["example.test"]);
        let filter = filters::replace(list, r"^www\d*\.", "").unwrap();

        let decision = filter.is_blocked("www2.example.test");
        assert!(decision.blocked);
        assert_eq!(decision.value, "www2.example.test");
        assert!(filter.domains().is_err());
    }

    #[test]
    fn test_hashed_list_behind_hostname_and_bloom() {
        let ws = Workspace::new();
        let path = ws.path().join("digests.filter");
        let digests = [".casino.test", "casino.test"]
            .map(|d| dbl_01_domain_filters::domain::hash_functions::digest(HashAlgorithm::Sha1, d.as_bytes()));
        let file: SharedFilter<[u8]> = Arc::new(
            HashFileFilter::from_digests(&path, 7, "gambling", HashAlgorithm::Sha1, &digests).unwrap(),
        );
        let fronted: SharedFilter<[u8]> =
            Arc::new(BloomDomainFilter::<[u8]>::new(file, 0.001).unwrap());
        let filter = filters::hostname(filters::hashing(HashAlgorithm::Sha1, fronted));

        let decision = filter.is_blocked("www.casino.test");
        assert!(decision.blocked);
        assert_eq!(decision.list_id(), Some(7));
        assert!(filter.is_blocked("casino.test").blocked);
        assert!(!filter.is_blocked("casino.example").blocked);
    }

    #[test]
    fn test_cache_in_front_of_file_counts_hits() {
        let ws = Workspace::new();
        let list = string_filter(&ws, 1, &["cached.test"]);
        let cache = Arc::new(CachingFilter::new(list, 2, CacheMode::All));

        for _ in 0..3 {
            assert!(cache.is_blocked("cached.test").blocked);
        }
        assert!(!cache.is_blocked("miss.test").blocked);
        cache.is_blocked("third.test");

        let stats = cache.stats();
        assert_eq!(stats.requests, 5);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.loads, 3);
        assert_eq!(stats.entries, 2);
    }

    #[test]
    fn test_attributes_survive_composition() {
        let ws = Workspace::new();
        let ads = filters::attribute(
            string_filter(&ws, 1, &["ads.test"]),
            "category",
            json!("advertising"),
            AttributeScope::Blocked,
        );
        let malware = string_filter(&ws, 2, &["bad.test"]);
        let combined = filters::or(vec![ads, malware]);

        let decision = combined.is_blocked("ads.test");
        assert_eq!(decision.attribute("category"), Some(&json!("advertising")));
        assert!(combined.is_blocked("bad.test").attribute("category").is_none());
        assert!(combined.is_blocked("none.test").attribute("category").is_none());
    }

    #[test]
    fn test_tree_introspection_finds_every_list() {
        let ws = Workspace::new();
        let a = string_filter(&ws, 1, &["a.test"]);
        let b = string_filter(&ws, 2, &["b.test"]);
        let c = string_filter(&ws, 3, &["c.test"]);
        let tree = filters::caching(
            filters::hostname(filters::or(vec![a, filters::and(vec![b, filters::not(c)])])),
            16,
            CacheMode::Blocked,
        );

        let node = FilterNode::Domain(tree);
        assert_eq!(node.list_ids(), BTreeSet::from([1, 2, 3]));
        assert!(node.references_list(3));
        assert!(!node.references_list(4));
    }

    #[test]
    fn test_constant_operands_simplify_away() {
        let ws = Workspace::new();
        let list = string_filter(&ws, 1, &["a.test"]);

        let unchanged = filters::or(vec![filters::constant(false), list.clone()]);
        assert_eq!(unchanged.name(), list.name());

        let always = filters::or(vec![list.clone(), filters::constant(true)]);
        assert!(always.is_blocked("anything.test").blocked);
        assert!(filters::hostname(filters::constant(false)).child_filters().is_empty());
    }
}
