//! # DBL-02 Filter Cache
//!
//! Versioned on-disk store for filter artifacts.
//!
//! ## Layout
//!
//! ```text
//! {root}/LOCK          exclusive lock while a cache instance is open
//! {root}/index.json    the index, rewritten atomically on every mutation
//! {root}/lists/        {id}-v{version}.bloom and {id}-v{version}.filter
//! {root}/profiles/     obsolete layout, emptied on upgrade
//! ```
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): `CacheIndex`, `CachedFileFilter`, index migration
//! - **Adapters Layer** (`adapters/`): directory lock, atomic file writes
//! - **Service Layer** (`service/`): `FilterCache`
//!
//! ## Invariants
//!
//! - Per list id the index is sorted by version, newest first
//! - Files are deleted only by `delete_marked_filters`, never by marking

pub mod adapters;
pub mod domain;
pub mod error;
pub mod service;

// Re-exports for convenience
pub use domain::{CacheIndex, CachedFileFilter, CURRENT_INDEX_FORMAT};
pub use error::CacheError;
pub use service::{FilterCache, INDEX_FILE, LISTS_DIR};
