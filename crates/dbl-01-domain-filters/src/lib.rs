//! # DBL-01 Domain Filters
//!
//! Membership filters for very large domain block lists.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): Pure vocabulary, no I/O
//!   - `DomainFilter`: capability implemented by every filter variant
//!   - `Decision`: verdict plus origin and attributes
//!   - `BloomFilter`: probabilistic pre-check structure
//!
//! - **Filters Layer** (`filters/`): Combinators and decorators
//!   - `and`, `or`, `parallel_or`, `not`: boolean algebra with simplification
//!   - `hostname`, `replace`, `hashing`, `attribute`: transforms
//!   - `caching`: LRU decision cache
//!   - `bloom`: bloom pre-filter decorator and bloom file format
//!
//! - **Storage Layer** (`storage/`): Bucketed on-disk lists
//!   - `StringFileFilter`: newline-delimited domains, hash-bucketed
//!   - `HashFileFilter`: sorted fixed-length digests, prefix-bucketed
//!
//! ## Invariants
//!
//! - Absence is a "not blocked" decision, never an error
//! - A bloom negative is final; a bloom positive is always confirmed
//! - Files keep the bucket function their version byte was written with
//!
//! ## Usage Example
//!
//! ```ignore
//! use dbl_01_domain_filters::{filters, SetFilter};
//! use std::sync::Arc;
//!
//! let ads = Arc::new(SetFilter::<str>::from_entries(Some(1), "ads", [".tracker.net"]));
//! let filter = filters::hostname(ads);
//!
//! assert!(filter.is_blocked("cdn.tracker.net").blocked);
//! ```

pub mod domain;
pub mod error;
pub mod filters;
pub mod storage;

// Re-exports for convenience
pub use domain::{
    BloomFilter, Decision, DecisionFor, DomainFilter, Domains, FilterNode, FilterOrigin,
    FilterShape, FilterValue, SharedFilter,
};
pub use error::FilterError;
pub use filters::{
    AttributeFilter, AttributeScope, BloomDomainFilter, CacheMode, CacheStats, CachingFilter,
    HashingFilter, HostnameFilter, ReplaceFilter, SetFilter, StaticFilter,
};
pub use storage::{HashFileFilter, StringFileFilter};
